use crate::errors::Result;
use crate::metrics::{
    CHANNEL_FULL_TOTAL, FETCHES_TOTAL, FETCH_FAILURES_TOTAL, FETCH_LATENCY_SECONDS,
    LATE_RESULTS_TOTAL,
};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Lifecycle notification for one fetch. `seq` increases by one per
/// invocation of the same poller.
#[derive(Debug)]
pub enum PollEvent<T> {
    Started(u64),
    Finished(u64, Result<T>),
    /// The poller was cancelled before this fetch's result was delivered.
    Cancelled(u64),
}

/// Handle returned by `start_polling`. Cancelling (or dropping) it stops
/// future ticks; fetches already in flight run to completion but report
/// `Cancelled` instead of their result.
#[derive(Debug)]
pub struct PollerHandle {
    name: &'static str,
    alive: watch::Sender<bool>,
    ticker: JoinHandle<()>,
}

impl PollerHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_active(&self) -> bool {
        *self.alive.borrow()
    }

    pub fn cancel(&self) {
        if self.alive.send_replace(false) {
            info!("Poller {} cancelled", self.name);
        }
        self.ticker.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Starts polling `fetch`: once immediately, then every `every` when set.
///
/// Each invocation runs on its own task, so a slow fetch never delays the
/// next tick, and a full channel never delays it either. Events go to `tx`,
/// which is expected to be drained by the single task that owns the
/// matching store.
pub fn start_polling<T, F, Fut>(
    name: &'static str,
    mut fetch: F,
    every: Option<Duration>,
    tx: mpsc::Sender<PollEvent<T>>,
) -> PollerHandle
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let (alive, liveness) = watch::channel(true);

    match every {
        Some(period) => info!("Starting poller {} every {:?}", name, period),
        None => info!("Starting one-shot poller {}", name),
    }

    let ticker = tokio::spawn(async move {
        let mut seq = 0u64;

        let Some(period) = every else {
            seq += 1;
            dispatch(name, seq, fetch(), &liveness, &tx);
            return;
        };

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !*liveness.borrow() {
                break;
            }
            seq += 1;
            if !dispatch(name, seq, fetch(), &liveness, &tx) {
                info!("Poller {} stopping, receiver closed", name);
                break;
            }
        }
    });

    PollerHandle {
        name,
        alive,
        ticker,
    }
}

/// Announces the request without waiting and spawns the fetch. Returns
/// false once the receiving side is gone.
fn dispatch<T, Fut>(
    name: &'static str,
    seq: u64,
    fut: Fut,
    liveness: &watch::Receiver<bool>,
    tx: &mpsc::Sender<PollEvent<T>>,
) -> bool
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    match tx.try_send(PollEvent::Started(seq)) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            CHANNEL_FULL_TOTAL.with_label_values(&[name]).inc();
            debug!("Poller {} channel full, fetch #{} starts unannounced", name, seq);
        }
        Err(TrySendError::Closed(_)) => return false,
    }
    FETCHES_TOTAL.with_label_values(&[name]).inc();
    debug!("Poller {} issued fetch #{}", name, seq);

    let mut liveness = liveness.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let start = Instant::now();
        let result = fut.await;
        let elapsed = start.elapsed().as_secs_f64();
        FETCH_LATENCY_SECONDS
            .with_label_values(&[name])
            .observe(elapsed);

        match &result {
            Ok(_) => debug!("Poller {} fetch #{} finished in {:.3}s", name, seq, elapsed),
            Err(e) => {
                FETCH_FAILURES_TOTAL.with_label_values(&[name]).inc();
                warn!("Poller {} fetch #{} failed after {:.3}s: {}", name, seq, elapsed, e);
            }
        }

        // Cancellation wins even while the send is waiting for capacity
        tokio::select! {
            biased;
            _ = cancelled(&mut liveness) => {
                LATE_RESULTS_TOTAL.inc();
                debug!("Poller {} cancelled, dropping result of fetch #{}", name, seq);
                let _ = tx.send(PollEvent::Cancelled(seq)).await;
            }
            _ = tx.send(PollEvent::Finished(seq, result)) => {}
        }
    });

    true
}

/// Resolves once the poller is cancelled or its handle is gone.
async fn cancelled(liveness: &mut watch::Receiver<bool>) {
    let _ = liveness.wait_for(|active| !*active).await;
}
