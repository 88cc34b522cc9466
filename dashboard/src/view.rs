//! Pure projections from store contents to display values.
//!
//! Nothing here is cached: every function recomputes from the snapshots it
//! is handed.

use crate::model::{ChartPoint, Recommendation, SensorReading, SensorType, WeatherSnapshot};
use crate::store::{Phase, Store};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_ALERTS: &str = "No active alerts. Your farm is looking good!";
const ICON_BASE_URL: &str = "http://openweathermap.org/img/wn";

/// Headline values and chart rows for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub temperature: String,
    pub moisture: String,
    pub humidity: String,
    pub chart: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherPanel {
    pub location: String,
    pub temperature: Option<String>,
    pub feels_like: Option<String>,
    pub description: String,
    pub icon_url: String,
    pub humidity: Option<String>,
    pub wind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum AlertsPanel {
    Loading,
    Failed(String),
    Empty(&'static str),
    Alerts(Vec<Recommendation>),
}

/// Reduces readings and weather into display values, labelling chart rows
/// in the local time zone.
pub fn reduce(readings: &[SensorReading], weather: Option<&WeatherSnapshot>) -> ViewModel {
    reduce_in(readings, weather, &Local)
}

pub fn reduce_in<Tz>(
    readings: &[SensorReading],
    weather: Option<&WeatherSnapshot>,
    tz: &Tz,
) -> ViewModel
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    ViewModel {
        temperature: display_temperature(readings, weather),
        moisture: display_moisture(readings),
        humidity: display_humidity(weather),
        chart: chart_series(readings, tz),
    }
}

/// Weather beats sensor beats "N/A"
pub fn display_temperature(
    readings: &[SensorReading],
    weather: Option<&WeatherSnapshot>,
) -> String {
    if let Some(temp) = weather.and_then(|w| w.main.temp) {
        return format!("{} °C (Weather)", fixed1(temp));
    }
    match latest(readings, &SensorType::Temperature) {
        Some(r) => format!("{} °C (Sensor)", fixed1(r.value)),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn display_moisture(readings: &[SensorReading]) -> String {
    latest(readings, &SensorType::SoilMoisture)
        .map(|r| format!("{} %", fixed1(r.value)))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn display_humidity(weather: Option<&WeatherSnapshot>) -> String {
    weather
        .and_then(|w| w.main.humidity)
        .map(|h| format!("{} %", fixed1(h)))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// One decimal place, with exact halves rounded away from zero.
///
/// `{:.1}` rounds an exact half to the even digit (22.25 gives "22.2"),
/// while readings are shown rounded up ("22.3"). Only values whose tenfold
/// is exactly representable as `k + 0.5` are halves; 0.35 is stored as
/// 0.3499... and still rounds down.
pub fn fixed1(v: f64) -> String {
    let twenty = v * 20.0;
    let exact = v.mul_add(20.0, -twenty) == 0.0;
    if exact && twenty.fract() == 0.0 && twenty % 2.0 != 0.0 {
        let tenths = (twenty.abs() as u64 + 1) / 2;
        let sign = if v < 0.0 { "-" } else { "" };
        return format!("{}{}.{}", sign, tenths / 10, tenths % 10);
    }
    format!("{:.1}", v)
}

/// Most recent reading of a type. Batches arrive newest-first, so this is
/// the first match in batch order.
pub fn latest<'a>(readings: &'a [SensorReading], kind: &SensorType) -> Option<&'a SensorReading> {
    readings.iter().find(|r| &r.sensor_type == kind)
}

/// One point per reading, oldest first
pub fn chart_series<Tz>(readings: &[SensorReading], tz: &Tz) -> Vec<ChartPoint>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    readings
        .iter()
        .rev()
        .map(|r| ChartPoint {
            timestamp: time_label(&r.timestamp, tz),
            temperature: (r.sensor_type == SensorType::Temperature).then_some(r.value),
            soil_moisture: (r.sensor_type == SensorType::SoilMoisture).then_some(r.value),
        })
        .collect()
}

/// Hour:minute label. Timestamps without an offset are taken as UTC, which
/// is what the farm backend stores.
pub fn time_label<Tz>(timestamp: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match parse_timestamp(timestamp) {
        Some(ts) => ts.with_timezone(tz).format("%H:%M").to_string(),
        None => timestamp.to_string(),
    }
}

fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn weather_panel(weather: &WeatherSnapshot) -> WeatherPanel {
    let (description, icon) = weather
        .condition()
        .map(|c| (c.description.clone(), c.icon.as_str()))
        .unwrap_or_default();

    WeatherPanel {
        location: weather.name.clone(),
        temperature: weather.main.temp.map(|t| format!("{}°C", fixed1(t))),
        feels_like: weather.main.feels_like.map(|t| format!("{}°C", fixed1(t))),
        description,
        icon_url: format!("{}/{}@2x.png", ICON_BASE_URL, icon),
        humidity: weather.main.humidity.map(|h| format!("{}%", h)),
        wind: weather
            .wind
            .as_ref()
            .and_then(|w| w.speed)
            .map(|s| format!("{} m/s", fixed1(s))),
    }
}

pub fn alerts_panel(store: &Store<Vec<Recommendation>>) -> AlertsPanel {
    match (store.phase(), store.data()) {
        (Phase::Idle, _) | (Phase::Loading, None) => AlertsPanel::Loading,
        (Phase::Failed(e), _) => AlertsPanel::Failed(e.clone()),
        (_, Some(recs)) if !recs.is_empty() => AlertsPanel::Alerts(recs.clone()),
        _ => AlertsPanel::Empty(NO_ALERTS),
    }
}
