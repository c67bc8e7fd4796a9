use std::env;
use std::path::PathBuf;

use log::{debug, info};

use crate::alerts::{AlertThresholds, PollutantThresholds};
use crate::database::RetryPolicy;
use crate::error::ConfigError;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// JSON export of the telemetry store, re-read every poll
    pub snapshot_path: PathBuf,
    /// Enables the PostgreSQL alert log when set
    pub database_url: Option<String>,
    pub poll_interval_secs: u64,
    pub history_limit: usize,
    pub retry: RetryPolicy,
    pub thresholds: AlertThresholds,
}

/// Parse an optional numeric variable, falling back to `default` when unset
fn parse_var<T: std::str::FromStr>(
    vars: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match vars(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: value.clone(),
        }),
        None => Ok(default),
    }
}

fn parse_thresholds(
    vars: &impl Fn(&str) -> Option<String>,
    warn_name: &'static str,
    bad_name: &'static str,
    default: PollutantThresholds,
) -> Result<PollutantThresholds, ConfigError> {
    let thresholds = PollutantThresholds {
        warn: parse_var(vars, warn_name, default.warn)?,
        bad: parse_var(vars, bad_name, default.bad)?,
    };
    if thresholds.bad < thresholds.warn {
        return Err(ConfigError::Inconsistent(format!(
            "{} ({}) must not be below {} ({})",
            bad_name, thresholds.bad, warn_name, thresholds.warn
        )));
    }
    Ok(thresholds)
}

impl MonitorConfig {
    /// Load configuration from the environment (and `.env` if present)
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup(vars: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let snapshot_path = vars("AQ_SNAPSHOT_PATH")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("AQ_SNAPSHOT_PATH"))?;

        let database_url = vars("DATABASE_URL").filter(|url| !url.trim().is_empty());
        match &database_url {
            Some(_) => info!("DATABASE_URL set, alerts will be stored in PostgreSQL"),
            None => info!("DATABASE_URL not set, alerts are kept in memory only"),
        }

        let defaults = AlertThresholds::default();
        let thresholds = AlertThresholds {
            pm25: parse_thresholds(&vars, "AQ_PM25_WARN", "AQ_PM25_BAD", defaults.pm25)?,
            o3: parse_thresholds(&vars, "AQ_O3_WARN", "AQ_O3_BAD", defaults.o3)?,
        };

        let default_retry = RetryPolicy::default();
        let config = MonitorConfig {
            snapshot_path,
            database_url,
            poll_interval_secs: parse_var(
                &vars,
                "AQ_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?
            .max(1),
            history_limit: parse_var(&vars, "AQ_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?,
            retry: RetryPolicy {
                max_retries: parse_var(&vars, "AQ_DB_MAX_RETRIES", default_retry.max_retries)?
                    .max(1),
                wait_between_retries_secs: parse_var(
                    &vars,
                    "AQ_DB_RETRY_WAIT_SECS",
                    default_retry.wait_between_retries_secs,
                )?,
            },
            thresholds,
        };

        debug!(
            "Loaded configuration: snapshot={}, poll={}s, history={}, thresholds={:?}",
            config.snapshot_path.display(),
            config.poll_interval_secs,
            config.history_limit,
            config.thresholds
        );
        Ok(config)
    }
}
