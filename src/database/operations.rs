/// Database operations for the alert log
use crate::database::connection::{execute_with_retry, RetryPolicy};
use crate::models::AlertRecord;

/// Create the alert table if it is missing
///
/// The table is a flat append-only mapping from alert id to record.
pub async fn create_alert_table(database_url: &str, policy: &RetryPolicy) -> Result<(), String> {
    execute_with_retry(database_url, policy, |client| async move {
        client
            .execute(
                "CREATE TABLE IF NOT EXISTS air_quality_alerts (
                    id TEXT PRIMARY KEY,
                    ts TIMESTAMPTZ NOT NULL,
                    type TEXT NOT NULL,
                    level TEXT NOT NULL,
                    value DOUBLE PRECISION NOT NULL,
                    message TEXT NOT NULL,
                    cls TEXT NOT NULL
                )",
                &[],
            )
            .await
    })
    .await
}

/// Store one alert record
///
/// Inserts are idempotent per id, so a retry after a lost acknowledgement
/// does not duplicate the alert.
///
/// # Arguments
/// * `record` - Alert to store
/// * `database_url` - PostgreSQL connection string
/// * `policy` - Retry policy for transient failures
///
/// # Returns
/// Result indicating success or failure
pub async fn store_alert(
    record: &AlertRecord,
    database_url: &str,
    policy: &RetryPolicy,
) -> Result<(), String> {
    // Clone data for move into async closure
    let record = record.clone();

    execute_with_retry(database_url, policy, move |client| {
        let record = record.clone();
        async move {
            client
                .execute(
                    "INSERT INTO air_quality_alerts(id, ts, type, level, value, message, cls)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)
                     ON CONFLICT (id) DO NOTHING",
                    &[
                        &record.id,
                        &record.ts,
                        &record.kind.as_str(),
                        &record.level,
                        &record.value,
                        &record.message,
                        &record.cls,
                    ],
                )
                .await
        }
    })
    .await
}
