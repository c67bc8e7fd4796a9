use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Canonical decoded snapshot of one device sample
///
/// Display units: `o3` in ppb, `co` in ppm, particulates in µg/m³.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub aqi: u16,
    pub co2: f64,
    pub o3: f64,
    pub co: f64,
    pub glp: f64,
    pub natural_gas: f64,
    pub pm1: f64,
    pub pm25: f64,
    pub rh: f64,
    pub temperature: f64,
    pub pressure: f64,
    pub pressure_label: String,
    pub timestamp: String,
}

/// One point of an AQI time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub timestamp: String,
    pub aqi: u16,
}

/// One point of an arbitrary numeric field time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPoint {
    pub timestamp: String,
    pub value: f64,
}

/// What an alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Aqi,
    Pm25,
    O3,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Aqi => "aqi",
            AlertKind::Pm25 => "pm25",
            AlertKind::O3 => "o3",
        }
    }
}

/// Immutable alert event appended to the alert log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub level: String,
    pub value: f64,
    pub message: String,
    pub cls: String,
}
