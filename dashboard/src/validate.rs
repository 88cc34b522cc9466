use crate::errors::{Error, Result};
use crate::model::{Condition, MainConditions, WeatherSnapshot, Wind};
use serde_json::{Map, Value};

const HUMIDITY_MIN: f64 = 0.0;
const HUMIDITY_MAX: f64 = 100.0;
const LAT_MIN: f64 = -90.0;
const LAT_MAX: f64 = 90.0;
const LON_MIN: f64 = -180.0;
const LON_MAX: f64 = 180.0;

/// Converts a raw weather-provider payload into a `WeatherSnapshot`.
///
/// `main` must be an object and `weather` a non-empty list of conditions.
/// Measurement fields may be missing, but a present field must be a finite
/// number.
pub fn weather_snapshot(payload: &Value) -> Result<WeatherSnapshot> {
    let root = payload
        .as_object()
        .ok_or_else(|| Error::Validation("weather payload is not an object".to_string()))?;

    let name = match root.get("name") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(Error::Validation(format!("weather name is not a string: {}", other)))
        }
    };

    let main = root
        .get("main")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::Validation("weather payload has no main section".to_string()))?;

    let main = MainConditions {
        temp: number(main, "main.temp")?,
        feels_like: number(main, "main.feels_like")?,
        humidity: number(main, "main.humidity")?,
    };

    // Validate humidity
    if let Some(humidity) = main.humidity {
        if !(HUMIDITY_MIN..=HUMIDITY_MAX).contains(&humidity) {
            return Err(Error::Validation(format!(
                "Humidity {} out of range [{}, {}]",
                humidity, HUMIDITY_MIN, HUMIDITY_MAX
            )));
        }
    }

    let conditions = root
        .get("weather")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Validation("weather payload has no condition list".to_string()))?;
    if conditions.is_empty() {
        return Err(Error::Validation("weather condition list is empty".to_string()));
    }
    let weather = conditions
        .iter()
        .map(condition)
        .collect::<Result<Vec<_>>>()?;

    let wind = match root.get("wind") {
        None | Some(Value::Null) => None,
        Some(Value::Object(w)) => Some(Wind {
            speed: number(w, "wind.speed")?,
        }),
        Some(_) => return Err(Error::Validation("wind is not an object".to_string())),
    };

    Ok(WeatherSnapshot {
        name,
        main,
        weather,
        wind,
    })
}

/// Validates a coordinate pair before it is put on the wire
pub fn coordinates(lat: f64, lon: f64) -> Result<()> {
    if !(LAT_MIN..=LAT_MAX).contains(&lat) {
        return Err(Error::Validation(format!(
            "Latitude {} out of range [{}, {}]",
            lat, LAT_MIN, LAT_MAX
        )));
    }
    if !(LON_MIN..=LON_MAX).contains(&lon) {
        return Err(Error::Validation(format!(
            "Longitude {} out of range [{}, {}]",
            lon, LON_MIN, LON_MAX
        )));
    }
    Ok(())
}

fn number(section: &Map<String, Value>, path: &str) -> Result<Option<f64>> {
    let key = path.rsplit('.').next().unwrap_or(path);
    match section.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(Error::Validation(format!("{} is not a finite number", path))),
        },
        Some(other) => Err(Error::Validation(format!("{} is not a number: {}", path, other))),
    }
}

fn condition(value: &Value) -> Result<Condition> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::Validation("weather condition is not an object".to_string()))?;
    let text = |key: &str| -> Result<String> {
        obj.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Validation(format!("weather condition has no {}", key)))
    };

    Ok(Condition {
        description: text("description")?,
        icon: text("icon")?,
    })
}
