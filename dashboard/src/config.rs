use crate::errors::{Error, Result};
use crate::validate;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Live farm dashboard: polls the farm backend and serves the reduced view.
#[derive(Debug, Clone, Parser)]
#[command(name = "farm-dashboard", version)]
pub struct Config {
    /// Base URL of the farm backend
    #[arg(long, env = "FARM_API_URL", default_value = "http://127.0.0.1:5001")]
    pub api_url: String,

    /// Latitude used for weather lookups
    #[arg(long, env = "FARM_LAT", default_value_t = 37.7749, allow_hyphen_values = true)]
    pub latitude: f64,

    /// Longitude used for weather lookups
    #[arg(long, env = "FARM_LON", default_value_t = -122.4194, allow_hyphen_values = true)]
    pub longitude: f64,

    /// Readings refresh period; unset means fetch once at startup
    #[arg(long, env = "READINGS_INTERVAL_MS")]
    pub readings_interval_ms: Option<u64>,

    #[arg(long, env = "WEATHER_INTERVAL_MS", default_value_t = 300_000)]
    pub weather_interval_ms: u64,

    #[arg(long, env = "RECOMMENDATIONS_INTERVAL_MS", default_value_t = 15_000)]
    pub recommendations_interval_ms: u64,

    /// Per-request timeout against the farm backend
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Address the dashboard HTTP surface binds to
    #[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: String,

    /// Knowledge base JSON to use instead of the bundled one
    #[arg(long, env = "KNOWLEDGE_BASE_PATH")]
    pub knowledge_base: Option<PathBuf>,

    /// Capacity of each poller-to-dashboard channel
    #[arg(long, env = "CHANNEL_CAPACITY", default_value_t = 64)]
    pub channel_capacity: usize,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "api_url must be an http(s) URL, got {}",
                self.api_url
            )));
        }
        validate::coordinates(self.latitude, self.longitude)
            .map_err(|e| Error::Config(e.to_string()))?;

        let intervals = [
            ("readings_interval_ms", self.readings_interval_ms),
            ("weather_interval_ms", Some(self.weather_interval_ms)),
            (
                "recommendations_interval_ms",
                Some(self.recommendations_interval_ms),
            ),
        ];
        for (name, value) in intervals {
            if value == Some(0) {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(Error::Config(
                "channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn readings_interval(&self) -> Option<Duration> {
        self.readings_interval_ms.map(Duration::from_millis)
    }

    pub fn weather_interval(&self) -> Duration {
        Duration::from_millis(self.weather_interval_ms)
    }

    pub fn recommendations_interval(&self) -> Duration {
        Duration::from_millis(self.recommendations_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
