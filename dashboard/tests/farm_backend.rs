use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::Parser;
use farm_dashboard::client::{FarmApi, ReadingsQuery};
use farm_dashboard::config::Config;
use farm_dashboard::dashboard::{self, DashboardSnapshot, DashboardState};
use farm_dashboard::errors::Error;
use farm_dashboard::model::{Priority, SensorType};
use farm_dashboard::view::AlertsPanel;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Stub of the farm backend. Recommendations are derived from the stored
/// readings with the backend's alert thresholds.
#[derive(Clone, Default)]
struct Backend {
    inner: Arc<Mutex<BackendState>>,
}

#[derive(Default)]
struct BackendState {
    readings: Vec<Value>,
    weather: Option<Value>,
    recommendations_status: Option<StatusCode>,
    weather_queries: Vec<HashMap<String, String>>,
}

impl Backend {
    fn set_readings(&self, readings: Vec<Value>) {
        self.inner.lock().unwrap().readings = readings;
    }

    fn set_weather(&self, weather: Value) {
        self.inner.lock().unwrap().weather = Some(weather);
    }

    fn fail_recommendations(&self, status: StatusCode) {
        self.inner.lock().unwrap().recommendations_status = Some(status);
    }
}

fn reading(id: i64, kind: &str, value: f64, minute: u32) -> Value {
    json!({
        "id": id,
        "value": value,
        "timestamp": format!("2024-01-01T10:{:02}:00", minute),
        "sensor_type": kind,
        "farm_name": "My First Farm",
    })
}

fn provider_weather(temp: f64, humidity: f64) -> Value {
    json!({
        "name": "San Francisco",
        "main": {"temp": temp, "feels_like": temp - 0.8, "humidity": humidity},
        "weather": [{"description": "few clouds", "icon": "02d"}],
        "wind": {"speed": 4.1}
    })
}

async fn readings(
    State(backend): State<Backend>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<Value>> {
    let state = backend.inner.lock().unwrap();
    let filtered = state
        .readings
        .iter()
        .filter(|r| match params.get("sensor_type") {
            Some(kind) => r["sensor_type"] == kind.as_str(),
            None => true,
        })
        .cloned()
        .collect();
    Json(filtered)
}

async fn weather(
    State(backend): State<Backend>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut state = backend.inner.lock().unwrap();
    state.weather_queries.push(params);
    match &state.weather {
        Some(w) => Json(w.clone()).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Could not retrieve weather data."})),
        )
            .into_response(),
    }
}

async fn recommendations(State(backend): State<Backend>) -> Response {
    let state = backend.inner.lock().unwrap();
    if let Some(status) = state.recommendations_status {
        return (status, "boom").into_response();
    }

    let mut recs = Vec::new();
    for r in &state.readings {
        let value = r["value"].as_f64().unwrap_or_default();
        let alert = match r["sensor_type"].as_str() {
            Some("soil_moisture") if value < 20.0 => Some((
                format!("Critical: Soil moisture is very low ({}%). Immediate watering required.", value),
                "high",
            )),
            Some("temperature") if value > 35.0 => Some((
                format!("Warning: Temperature is high ({}°C). Check for plant stress.", value),
                "medium",
            )),
            _ => None,
        };
        if let Some((message, priority)) = alert {
            recs.push(json!({
                "id": recs.len() + 1,
                "message": message,
                "priority": priority,
                "timestamp": r["timestamp"],
                "farm_id": 1,
            }));
        }
    }
    Json(recs).into_response()
}

async fn serve(backend: Backend) -> SocketAddr {
    let app = Router::new()
        .route("/api/readings", get(readings))
        .route("/api/weather", get(weather))
        .route("/api/recommendations", get(recommendations))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn api(addr: SocketAddr) -> FarmApi {
    FarmApi::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap()
}

async fn wait_for<F>(
    snapshots: &mut watch::Receiver<DashboardSnapshot>,
    mut done: F,
) -> DashboardSnapshot
where
    F: FnMut(&DashboardSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            {
                let current = snapshots.borrow_and_update();
                if done(&current) {
                    return current.clone();
                }
            }
            snapshots.changed().await.unwrap();
        }
    })
    .await
    .expect("snapshot condition not reached in time")
}

#[tokio::test]
async fn test_client_decodes_every_endpoint() {
    let backend = Backend::default();
    backend.set_readings(vec![
        reading(3, "soil_moisture", 12.5, 10),
        reading(2, "temperature", 36.2, 5),
        reading(1, "temperature", 24.0, 0),
    ]);
    backend.set_weather(provider_weather(18.0, 55.0));
    let addr = serve(backend.clone()).await;
    let api = api(addr);

    let batch = api.readings(&ReadingsQuery::default()).await.unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(batch[0].sensor_type, SensorType::SoilMoisture);

    let weather = api.weather(37.7749, -122.4194).await.unwrap();
    assert_eq!(weather.main.temp, Some(18.0));
    let query = backend.inner.lock().unwrap().weather_queries[0].clone();
    assert_eq!(query.get("lat").map(String::as_str), Some("37.7749"));
    assert_eq!(query.get("lon").map(String::as_str), Some("-122.4194"));

    let recs = api.recommendations().await.unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0].priority, Priority::High);
    assert_eq!(recs[1].priority, Priority::Medium);
}

#[tokio::test]
async fn test_readings_filter_is_sent() {
    let backend = Backend::default();
    backend.set_readings(vec![
        reading(2, "soil_moisture", 40.0, 5),
        reading(1, "temperature", 24.0, 0),
    ]);
    let addr = serve(backend).await;

    let query = ReadingsQuery {
        sensor_type: Some("temperature".to_string()),
        ..Default::default()
    };
    let batch = api(addr).readings(&query).await.unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].id, 1);
}

#[tokio::test]
async fn test_error_status_and_malformed_weather() {
    let backend = Backend::default();
    backend.fail_recommendations(StatusCode::INTERNAL_SERVER_ERROR);
    let addr = serve(backend.clone()).await;
    let api = api(addr);

    let err = api.recommendations().await.unwrap_err();
    assert!(matches!(err, Error::Status(500)));
    assert_eq!(err.to_string(), "Network response was not ok");

    // Weather API answered, but with an empty condition list
    backend.set_weather(json!({"name": "X", "main": {"temp": 1.0}, "weather": []}));
    let err = api.weather(0.0, 0.0).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_dashboard_end_to_end() {
    let backend = Backend::default();
    backend.set_readings(vec![
        reading(3, "soil_moisture", 12.5, 10),
        reading(2, "temperature", 22.3, 5),
    ]);
    let addr = serve(backend.clone()).await;

    let api_url = format!("http://{}", addr);
    let config = Config::parse_from([
        "farm-dashboard",
        "--api-url",
        api_url.as_str(),
        "--weather-interval-ms",
        "50",
        "--recommendations-interval-ms",
        "50",
    ]);
    let (publish, mut snapshots) = watch::channel(DashboardState::default().snapshot());
    let (pollers, feeds) = dashboard::spawn_pollers(&api(addr), &config);
    let task = tokio::spawn(dashboard::run_dashboard(feeds, publish));

    // No weather yet: sensor fallback, weather store in error
    let snapshot = wait_for(&mut snapshots, |s| {
        s.view.temperature.ends_with("(Sensor)") && matches!(s.alerts, AlertsPanel::Alerts(_))
    })
    .await;
    assert_eq!(snapshot.view.temperature, "22.3 °C (Sensor)");
    assert_eq!(snapshot.view.moisture, "12.5 %");
    assert_eq!(snapshot.view.humidity, "N/A");
    assert_eq!(snapshot.view.chart.len(), 2);
    assert_eq!(snapshot.view.chart[0].temperature, Some(22.3));

    // Weather comes online and takes priority
    backend.set_weather(provider_weather(18.0, 55.0));
    let snapshot = wait_for(&mut snapshots, |s| s.view.temperature.ends_with("(Weather)")).await;
    assert_eq!(snapshot.view.temperature, "18.0 °C (Weather)");
    assert_eq!(snapshot.view.humidity, "55.0 %");
    assert_eq!(snapshot.weather.as_ref().map(|w| w.location.as_str()), Some("San Francisco"));

    // Recommendations start failing: error shown, readings untouched
    backend.fail_recommendations(StatusCode::INTERNAL_SERVER_ERROR);
    let snapshot = wait_for(&mut snapshots, |s| matches!(s.alerts, AlertsPanel::Failed(_))).await;
    assert_eq!(
        snapshot.alerts,
        AlertsPanel::Failed("Network response was not ok".to_string())
    );
    assert_eq!(snapshot.readings.len(), 2);
    assert_eq!(snapshot.view.moisture, "12.5 %");

    pollers.shutdown();
    let state = tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("dashboard did not stop after pollers shut down")
        .unwrap();
    // Last good list is retained behind the error
    assert_eq!(state.recommendations.data().map(Vec::len), Some(1));
    assert_eq!(state.recommendations.error(), Some("Network response was not ok"));
}
