/// Error types shared across the store, alert log and configuration layers
use thiserror::Error;

/// Failures reading from the telemetry store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed snapshot: {0}")]
    Malformed(String),
}

/// Failures appending to the alert log
#[derive(Debug, Error)]
pub enum AlertLogError {
    #[error("alert log write failed: {0}")]
    Write(String),
}

/// Invalid or missing configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),
    #[error("{name} must be a number, got '{value}'")]
    Invalid { name: &'static str, value: String },
    #[error("{0}")]
    Inconsistent(String),
}
