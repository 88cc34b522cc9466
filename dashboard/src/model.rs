use serde::{Deserialize, Serialize};

/// Kind of sensor a reading came from. Unknown kinds are carried through
/// untouched so new sensors never break decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SensorType {
    Temperature,
    SoilMoisture,
    Other(String),
}

impl SensorType {
    pub fn as_str(&self) -> &str {
        match self {
            SensorType::Temperature => "temperature",
            SensorType::SoilMoisture => "soil_moisture",
            SensorType::Other(s) => s,
        }
    }
}

impl From<String> for SensorType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "temperature" => SensorType::Temperature,
            "soil_moisture" => SensorType::SoilMoisture,
            _ => SensorType::Other(s),
        }
    }
}

impl From<SensorType> for String {
    fn from(t: SensorType) -> Self {
        match t {
            SensorType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// One sensor reading as served by `/api/readings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: i64,
    pub value: f64,
    pub timestamp: String,
    pub sensor_type: SensorType,
    pub farm_name: String,
}

/// Alert priority. Values outside the known three are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    High,
    Medium,
    Low,
    Unknown(String),
}

impl Priority {
    pub fn as_str(&self) -> &str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::Unknown(s) => s,
        }
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        match s.as_str() {
            "high" => Priority::High,
            "medium" => Priority::Medium,
            "low" => Priority::Low,
            _ => Priority::Unknown(s),
        }
    }
}

impl From<Priority> for String {
    fn from(p: Priority) -> Self {
        match p {
            Priority::Unknown(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: i64,
    pub message: String,
    pub priority: Priority,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MainConditions {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
}

/// Validated weather payload. Built by `validate::weather_snapshot`, never
/// decoded straight from the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub name: String,
    pub main: MainConditions,
    /// Never empty; the first entry is the authoritative condition.
    pub weather: Vec<Condition>,
    pub wind: Option<Wind>,
}

impl WeatherSnapshot {
    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }
}

/// Plant-health knowledge base entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: i64,
    pub condition_name: String,
    pub symptoms: String,
    pub cause: String,
    pub recommendation: String,
}

/// One chart row, chronological position implied by its index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: String,
    pub temperature: Option<f64>,
    pub soil_moisture: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_decodes_known_and_unknown_types() {
        let payload = r#"[
            {"id": 2, "value": 31.5, "timestamp": "2024-01-01T10:05:00", "sensor_type": "soil_moisture", "farm_name": "North"},
            {"id": 1, "value": 7.0, "timestamp": "2024-01-01T10:00:00", "sensor_type": "ph", "farm_name": "North"}
        ]"#;

        let readings: Vec<SensorReading> = serde_json::from_str(payload).unwrap();
        assert_eq!(readings[0].sensor_type, SensorType::SoilMoisture);
        assert_eq!(readings[1].sensor_type, SensorType::Other("ph".to_string()));

        let back = serde_json::to_value(&readings[1]).unwrap();
        assert_eq!(back["sensor_type"], "ph");
    }

    #[test]
    fn test_priority_keeps_unknown_values() {
        let rec: Recommendation = serde_json::from_str(
            r#"{"id": 9, "message": "check pump", "priority": "urgent", "timestamp": "2024-01-01T10:00:00", "farm_id": 1}"#,
        )
        .unwrap();

        assert_eq!(rec.priority, Priority::Unknown("urgent".to_string()));
        assert_eq!(rec.priority.as_str(), "urgent");
    }

    #[test]
    fn test_recommendation_without_farm_id() {
        let rec: Recommendation = serde_json::from_str(
            r#"{"id": 1, "message": "water now", "priority": "high", "timestamp": "2024-01-01T10:00:00"}"#,
        )
        .unwrap();

        assert_eq!(rec.priority, Priority::High);
        assert_eq!(rec.farm_id, None);
    }
}
