/// Decoding raw device samples into canonical sensor readings
///
/// Default table, applied in one place:
/// - any missing or non-numeric leaf decodes as `0.0`
/// - a missing timestamp decodes as the bucket date joined with the inner key
/// - `pressure_label` is formatted from the defaulted pressure
///
/// Unit spaces: the store reports O3 in ppb (under the `o3_ppm` name) and
/// PM2.5 in µg/m³ (under `pm25_mgm3`). Readings keep O3 in ppb for display;
/// only the AQI computation sees ppm.
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::aqi::overall_aqi;
use crate::models::SensorReading;
use crate::utils::as_number;

const PPB_PER_PPM: f64 = 1000.0;

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(as_number))
}

fn lenient_group<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|group| T::deserialize(group).ok())
        .unwrap_or_default())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Environment {
    #[serde(deserialize_with = "lenient_number")]
    pub temperature: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub humidity: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub pressure: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Gases {
    #[serde(deserialize_with = "lenient_number")]
    pub co_ppm: Option<f64>,
    /// Ozone in ppb despite the field name
    #[serde(deserialize_with = "lenient_number")]
    pub o3_ppm: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub glp: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub lpg: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub natural_gas: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub air_quality_ppm: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Particulates {
    #[serde(deserialize_with = "lenient_number")]
    pub pm1_ugm3: Option<f64>,
    /// PM2.5 in µg/m³ despite the field name
    #[serde(deserialize_with = "lenient_number")]
    pub pm25_mgm3: Option<f64>,
}

/// Raw sample document as written by the device
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawDeviceSample {
    #[serde(deserialize_with = "lenient_group")]
    pub environment: Environment,
    #[serde(deserialize_with = "lenient_group")]
    pub gases: Gases,
    #[serde(deserialize_with = "lenient_group")]
    pub particulates: Particulates,
    #[serde(deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
}

impl RawDeviceSample {
    /// Interpret a store document; anything unreadable becomes an all-default sample
    pub fn from_value(value: &Value) -> Self {
        match RawDeviceSample::deserialize(value) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Unreadable sample document, using defaults: {}", e);
                RawDeviceSample::default()
            }
        }
    }

    /// The sample's own timestamp, or `fallback` when it has none
    pub fn timestamp_or(&self, fallback: &str) -> String {
        self.timestamp
            .clone()
            .filter(|ts| !ts.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Timestamp of a sample stored under `key` in the `date_key` bucket
pub fn key_timestamp(date_key: &str, key: &str) -> String {
    format!("{} {}", date_key, key)
}

/// Decode a sample into a fully-populated reading
///
/// # Arguments
/// * `sample` - Raw device sample
/// * `fallback_timestamp` - Used when the sample carries no timestamp
pub fn decode_sample(sample: &RawDeviceSample, fallback_timestamp: &str) -> SensorReading {
    let env = &sample.environment;
    let gases = &sample.gases;
    let particulates = &sample.particulates;

    let o3_ppb = gases.o3_ppm.unwrap_or(0.0);
    let co_ppm = gases.co_ppm.unwrap_or(0.0);
    let pm25 = particulates.pm25_mgm3.unwrap_or(0.0);
    let pressure = env.pressure.unwrap_or(0.0);

    SensorReading {
        aqi: overall_aqi(pm25, o3_ppb / PPB_PER_PPM, co_ppm),
        co2: gases.air_quality_ppm.unwrap_or(0.0),
        o3: o3_ppb,
        co: co_ppm,
        glp: gases.glp.or(gases.lpg).unwrap_or(0.0),
        natural_gas: gases.natural_gas.unwrap_or(0.0),
        pm1: particulates.pm1_ugm3.unwrap_or(0.0),
        pm25,
        rh: env.humidity.unwrap_or(0.0),
        temperature: env.temperature.unwrap_or(0.0),
        pressure,
        pressure_label: format!("{:.1} hPa", pressure),
        timestamp: sample.timestamp_or(fallback_timestamp),
    }
}

/// Decode a store document directly
pub fn decode_value(value: &Value, fallback_timestamp: &str) -> SensorReading {
    decode_sample(&RawDeviceSample::from_value(value), fallback_timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aqi::{individual_aqi, O3};
    use serde_json::json;

    #[test]
    fn decodes_full_sample() {
        let reading = decode_value(
            &json!({
                "environment": {"temperature": 21.5, "humidity": 40.0, "pressure": 1012.34},
                "gases": {
                    "co_ppm": 0.4,
                    "o3_ppm": 60.0,
                    "lpg": 3.0,
                    "natural_gas": 2.0,
                    "air_quality_ppm": 410.0
                },
                "particulates": {"pm1_ugm3": 4.0, "pm25_mgm3": 8.0},
                "timestamp": "2024-05-01 10:00:00"
            }),
            &key_timestamp("2024-05-01", "09:59:59"),
        );

        assert_eq!(reading.o3, 60.0);
        assert_eq!(reading.glp, 3.0);
        assert_eq!(reading.co2, 410.0);
        assert_eq!(reading.pressure_label, "1012.3 hPa");
        assert_eq!(reading.timestamp, "2024-05-01 10:00:00");
        // 60 ppb = 0.060 ppm drives the index above PM2.5 at 8 µg/m³
        assert_eq!(reading.aqi, individual_aqi(0.060, &O3));
    }

    #[test]
    fn missing_and_malformed_leaves_default_to_zero() {
        let reading = decode_value(
            &json!({
                "environment": {"humidity": "n/a"},
                "gases": {"co_ppm": null, "o3_ppm": "35"},
                "particulates": "offline"
            }),
            &key_timestamp("2024-05-01", "10:00:05"),
        );

        assert_eq!(reading.rh, 0.0);
        assert_eq!(reading.co, 0.0);
        assert_eq!(reading.o3, 35.0);
        assert_eq!(reading.pm25, 0.0);
        assert_eq!(reading.pressure_label, "0.0 hPa");
        assert_eq!(reading.timestamp, "2024-05-01 10:00:05");
    }

    #[test]
    fn blank_timestamp_uses_fallback() {
        let sample = RawDeviceSample::from_value(&json!({"timestamp": "  "}));
        assert_eq!(sample.timestamp_or("2024-05-01 08:00:00"), "2024-05-01 08:00:00");
    }

    #[test]
    fn non_object_document_decodes_to_defaults() {
        let reading = decode_value(&json!(42), "");
        assert_eq!(reading.aqi, 0);
        assert_eq!(reading.timestamp, "");
    }
}
