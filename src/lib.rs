//! Air quality monitoring core
//!
//! Computes EPA-style AQI values from device samples, follows the latest
//! sample of a two-level time-series store, and raises deduplicated alerts
//! when air quality crosses health-relevant thresholds.

pub mod alerts;
pub mod aqi;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod store;
pub mod telemetry;
pub mod utils;

pub use alerts::{evaluate, AlertLog, AlertState, AlertStateMachine, AlertThresholds};
pub use aqi::{individual_aqi, overall_aqi, AqiCategory};
pub use models::{AlertKind, AlertRecord, FieldPoint, HistoricalPoint, SensorReading};
pub use store::{MemoryStore, TelemetryStore};
pub use telemetry::{
    fetch_field, fetch_history, subscribe_latest, watch_latest, LatestSubscription, LiveFeed,
};
