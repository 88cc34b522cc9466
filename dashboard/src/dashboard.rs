use crate::client::{FarmApi, ReadingsQuery};
use crate::config::Config;
use crate::model::{Recommendation, SensorReading, WeatherSnapshot};
use crate::poller::{start_polling, PollEvent, PollerHandle};
use crate::store::{Phase, Store};
use crate::view::{self, AlertsPanel, ViewModel, WeatherPanel};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Receiving ends of the three pollers
pub struct Feeds {
    pub readings: mpsc::Receiver<PollEvent<Vec<SensorReading>>>,
    pub weather: mpsc::Receiver<PollEvent<WeatherSnapshot>>,
    pub recommendations: mpsc::Receiver<PollEvent<Vec<Recommendation>>>,
}

/// Everything a presentation layer needs, recomputed after every update
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub view: ViewModel,
    pub chart_loading: bool,
    pub readings_status: Phase,
    pub weather_status: Phase,
    pub readings: Vec<SensorReading>,
    pub weather: Option<WeatherPanel>,
    pub alerts: AlertsPanel,
}

/// The three stores. Only `run_dashboard` mutates them.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub readings: Store<Vec<SensorReading>>,
    pub weather: Store<WeatherSnapshot>,
    pub recommendations: Store<Vec<Recommendation>>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            readings: Store::new("readings"),
            weather: Store::new("weather"),
            recommendations: Store::new("recommendations"),
        }
    }
}

impl DashboardState {
    pub fn snapshot(&self) -> DashboardSnapshot {
        let readings = self.readings.data().map(Vec::as_slice).unwrap_or_default();
        let weather = self.weather.data();

        DashboardSnapshot {
            view: view::reduce(readings, weather),
            chart_loading: self.readings.loading() || self.weather.loading(),
            readings_status: self.readings.phase().clone(),
            weather_status: self.weather.phase().clone(),
            readings: readings.to_vec(),
            weather: weather.map(view::weather_panel),
            alerts: view::alerts_panel(&self.recommendations),
        }
    }
}

/// Running pollers; cancels all of them on `shutdown` or drop.
pub struct Pollers {
    handles: Vec<PollerHandle>,
}

impl Pollers {
    pub fn shutdown(self) {
        for handle in self.handles.iter().filter(|h| h.is_active()) {
            handle.cancel();
            debug!("Poller {} stopped", handle.name());
        }
        info!("Stopped {} pollers", self.handles.len());
    }
}

/// Starts one poller per source against the farm backend
pub fn spawn_pollers(api: &FarmApi, config: &Config) -> (Pollers, Feeds) {
    let capacity = config.channel_capacity;
    let (readings_tx, readings_rx) = mpsc::channel(capacity);
    let (weather_tx, weather_rx) = mpsc::channel(capacity);
    let (recs_tx, recs_rx) = mpsc::channel(capacity);

    let readings = {
        let api = api.clone();
        start_polling(
            "readings",
            move || {
                let api = api.clone();
                async move { api.readings(&ReadingsQuery::default()).await }
            },
            config.readings_interval(),
            readings_tx,
        )
    };

    let weather = {
        let api = api.clone();
        let (lat, lon) = (config.latitude, config.longitude);
        start_polling(
            "weather",
            move || {
                let api = api.clone();
                async move { api.weather(lat, lon).await }
            },
            Some(config.weather_interval()),
            weather_tx,
        )
    };

    let recommendations = {
        let api = api.clone();
        start_polling(
            "recommendations",
            move || {
                let api = api.clone();
                async move { api.recommendations().await }
            },
            Some(config.recommendations_interval()),
            recs_tx,
        )
    };

    (
        Pollers {
            handles: vec![readings, weather, recommendations],
        },
        Feeds {
            readings: readings_rx,
            weather: weather_rx,
            recommendations: recs_rx,
        },
    )
}

/// Owns the stores: applies poller events in arrival order and publishes a
/// fresh snapshot after each change. Returns once every feed has closed.
pub async fn run_dashboard(
    mut feeds: Feeds,
    publish: watch::Sender<DashboardSnapshot>,
) -> DashboardState {
    info!("Starting dashboard");

    let mut state = DashboardState::default();

    loop {
        let changed = tokio::select! {
            Some(event) = feeds.readings.recv() => state.readings.apply(event),
            Some(event) = feeds.weather.recv() => state.weather.apply(event),
            Some(event) = feeds.recommendations.recv() => state.recommendations.apply(event),
            else => {
                info!("All feeds closed");
                break;
            }
        };

        if changed {
            debug!("Store updated, republishing snapshot");
            publish.send_replace(state.snapshot());
        }
    }

    info!("Dashboard stopped");
    state
}
