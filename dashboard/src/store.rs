use crate::metrics::STALE_RESPONSES_TOTAL;
use crate::poller::PollEvent;
use serde::Serialize;
use tracing::debug;

/// Where a store is in its request cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// Latest successfully fetched value for one source plus its status.
///
/// Data is only ever replaced wholesale by a successful fetch. A failure
/// sets `Phase::Failed` and keeps the last good data around.
#[derive(Debug, Clone)]
pub struct Store<T> {
    source: &'static str,
    phase: Phase,
    /// Phase to fall back to if the fetch in flight is cancelled
    settled: Phase,
    data: Option<T>,
    last_applied: u64,
}

impl<T> Store<T> {
    pub fn new(source: &'static str) -> Self {
        Self {
            source,
            phase: Phase::Idle,
            settled: Phase::Idle,
            data: None,
            last_applied: 0,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Applies one poller event. Completions that are not newer than the
    /// last applied one are discarded; returns whether the store changed.
    pub fn apply(&mut self, event: PollEvent<T>) -> bool {
        match event {
            PollEvent::Started(seq) => {
                if seq <= self.last_applied || self.phase == Phase::Loading {
                    return false;
                }
                self.settled = std::mem::replace(&mut self.phase, Phase::Loading);
                true
            }
            PollEvent::Cancelled(seq) => {
                if seq <= self.last_applied || self.phase != Phase::Loading {
                    return false;
                }
                debug!("Store {} fetch #{} cancelled", self.source, seq);
                self.phase = self.settled.clone();
                true
            }
            PollEvent::Finished(seq, result) => {
                if seq <= self.last_applied {
                    STALE_RESPONSES_TOTAL
                        .with_label_values(&[self.source])
                        .inc();
                    debug!(
                        "Store {} discarding stale response #{} (last applied #{})",
                        self.source, seq, self.last_applied
                    );
                    return false;
                }
                self.last_applied = seq;
                match result {
                    Ok(data) => {
                        self.data = Some(data);
                        self.phase = Phase::Ready;
                    }
                    Err(e) => {
                        self.phase = Phase::Failed(e.to_string());
                    }
                }
                true
            }
        }
    }
}
