/// One-shot history reads over a single date bucket
use log::debug;

use super::decoder::{decode_value, key_timestamp, RawDeviceSample};
use crate::error::StoreError;
use crate::models::{FieldPoint, HistoricalPoint};
use crate::store::TelemetryStore;
use crate::utils::{number_at, timestamp_sort_key};

/// Fetch the AQI series of the `limit` most recent samples in a bucket
///
/// Every call re-reads the store. Points are sorted ascending by timestamp
/// whatever order the store returned them in.
///
/// # Arguments
/// * `store` - Telemetry store to read from
/// * `date_key` - Outer key of the bucket
/// * `limit` - Maximum number of samples
pub async fn fetch_history<S: TelemetryStore + ?Sized>(
    store: &S,
    date_key: &str,
    limit: usize,
) -> Result<Vec<HistoricalPoint>, StoreError> {
    let children = store.fetch_last(date_key, Some(limit)).await?;

    let mut points: Vec<HistoricalPoint> = children
        .iter()
        .map(|child| {
            let fallback = key_timestamp(date_key, &child.key);
            let reading = decode_value(&child.value, &fallback);
            HistoricalPoint {
                timestamp: reading.timestamp,
                aqi: reading.aqi,
            }
        })
        .collect();
    points.sort_by_cached_key(|point| timestamp_sort_key(&point.timestamp));

    debug!("Fetched {} AQI points from {}", points.len(), date_key);
    Ok(points)
}

/// Extract a numeric leaf (dotted path, e.g. `environment.temperature`) from
/// every sample in a bucket
///
/// Samples where the path is missing or not numeric are skipped. Samples
/// without a timestamp are placed by their bucket date and store key.
pub async fn fetch_field<S: TelemetryStore + ?Sized>(
    store: &S,
    date_key: &str,
    field_path: &str,
) -> Result<Vec<FieldPoint>, StoreError> {
    let children = store.fetch_last(date_key, None).await?;

    let mut points: Vec<FieldPoint> = children
        .iter()
        .filter_map(|child| {
            let value = number_at(&child.value, field_path)?;
            let timestamp = RawDeviceSample::from_value(&child.value)
                .timestamp_or(&key_timestamp(date_key, &child.key));
            Some(FieldPoint { timestamp, value })
        })
        .collect();
    points.sort_by_cached_key(|point| timestamp_sort_key(&point.timestamp));

    debug!(
        "Fetched {} points of {} from {}",
        points.len(),
        field_path,
        date_key
    );
    Ok(points)
}
