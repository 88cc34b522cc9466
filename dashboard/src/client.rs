use crate::errors::{Error, Result};
use crate::model::{Recommendation, SensorReading, WeatherSnapshot};
use crate::validate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Optional filters for `/api/readings`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReadingsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Thin client for the farm backend. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FarmApi {
    http: reqwest::Client,
    base_url: String,
}

impl FarmApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("farm-dashboard/0.1")
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Latest readings, newest first
    pub async fn readings(&self, query: &ReadingsQuery) -> Result<Vec<SensorReading>> {
        self.get_json("/api/readings", query).await
    }

    pub async fn weather(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot> {
        validate::coordinates(lat, lon)?;
        let payload: serde_json::Value = self
            .get_json("/api/weather", &[("lat", lat), ("lon", lon)])
            .await?;
        validate::weather_snapshot(&payload)
    }

    pub async fn recommendations(&self) -> Result<Vec<Recommendation>> {
        let no_filters: [(&str, &str); 0] = [];
        self.get_json("/api/recommendations", &no_filters).await
    }

    async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }

        // Decode separately so malformed bodies surface as JSON errors
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
