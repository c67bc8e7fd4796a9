/// Append-only alert log collaborators
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use log::debug;

use crate::database::connection::RetryPolicy;
use crate::database::operations::{create_alert_table, store_alert};
use crate::error::AlertLogError;
use crate::models::AlertRecord;

/// Destination for emitted alerts; never read back by the state machine
#[async_trait]
pub trait AlertLog: Send + Sync {
    async fn append(&self, record: &AlertRecord) -> Result<(), AlertLogError>;
}

/// Alerts kept in process memory, in append order
#[derive(Debug, Default)]
pub struct MemoryAlertLog {
    records: Mutex<Vec<AlertRecord>>,
}

impl MemoryAlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<AlertRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn records(&self) -> Vec<AlertRecord> {
        self.guard().clone()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AlertLog for MemoryAlertLog {
    async fn append(&self, record: &AlertRecord) -> Result<(), AlertLogError> {
        self.guard().push(record.clone());
        Ok(())
    }
}

/// Alerts written to the `air_quality_alerts` table, keyed by alert id
#[derive(Debug, Clone)]
pub struct PostgresAlertLog {
    database_url: String,
    retry: RetryPolicy,
}

impl PostgresAlertLog {
    pub fn new(database_url: &str, retry: RetryPolicy) -> Self {
        Self {
            database_url: database_url.to_string(),
            retry,
        }
    }

    /// Create the alert table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), AlertLogError> {
        create_alert_table(&self.database_url, &self.retry)
            .await
            .map_err(AlertLogError::Write)
    }
}

#[async_trait]
impl AlertLog for PostgresAlertLog {
    async fn append(&self, record: &AlertRecord) -> Result<(), AlertLogError> {
        store_alert(record, &self.database_url, &self.retry)
            .await
            .map_err(AlertLogError::Write)?;
        debug!("Stored alert {}", record.id);
        Ok(())
    }
}
