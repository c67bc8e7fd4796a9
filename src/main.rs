use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};
use time::OffsetDateTime;
use tokio::time::{sleep, Duration};

use air_quality_monitor::alerts::{AlertLog, AlertStateMachine, MemoryAlertLog, PostgresAlertLog};
use air_quality_monitor::config::MonitorConfig;
use air_quality_monitor::store::snapshot::load_snapshot;
use air_quality_monitor::store::MemoryStore;
use air_quality_monitor::telemetry::{fetch_field, fetch_history, watch_latest, LiveFeed};
use air_quality_monitor::utils::{duration_to_seconds, format_datetime};

/// Reload the snapshot file into the store; watchers see only what changed
async fn refresh_store(store: &MemoryStore, path: &Path) {
    match load_snapshot(path).await {
        Ok(tree) => store.replace_all(tree),
        Err(e) => error!("Snapshot refresh failed: {}", e),
    }
}

/// Log a short summary of the most recent date bucket
async fn log_history_summary(store: &MemoryStore, limit: usize) {
    let Some(bucket) = store.last_bucket() else {
        warn!("No data in store yet");
        return;
    };

    match fetch_history(store, &bucket, limit).await {
        Ok(points) if !points.is_empty() => {
            let min = points.iter().map(|p| p.aqi).min().unwrap_or(0);
            let max = points.iter().map(|p| p.aqi).max().unwrap_or(0);
            info!("Summary for {}:", bucket);
            info!("  Last {} samples, AQI min {} / max {}", points.len(), min, max);
            if let Some(latest) = points.last() {
                info!("  Latest AQI {} at {}", latest.aqi, latest.timestamp);
            }
        }
        Ok(_) => warn!("Bucket {} has no samples", bucket),
        Err(e) => error!("History fetch failed for {}: {}", bucket, e),
    }

    match fetch_field(store, &bucket, "environment.temperature").await {
        Ok(points) if !points.is_empty() => {
            let mean = points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64;
            info!("  Average temperature: {:.2}°C", mean);
        }
        Ok(_) => {}
        Err(e) => error!("Temperature fetch failed for {}: {}", bucket, e),
    }
}

async fn main_loop(config: MonitorConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting air quality monitor");

    let alert_log: Arc<dyn AlertLog> = match &config.database_url {
        Some(database_url) => {
            let log = PostgresAlertLog::new(database_url, config.retry);
            log.ensure_schema().await?;
            Arc::new(log)
        }
        None => Arc::new(MemoryAlertLog::new()),
    };

    let store = Arc::new(MemoryStore::new());
    refresh_store(&store, &config.snapshot_path).await;

    let LiveFeed {
        subscription,
        readings,
        loading,
    } = watch_latest(store.clone());

    // Single consumer: alerts are evaluated strictly in arrival order
    let mut machine = AlertStateMachine::new(config.thresholds, alert_log);
    let consumer = tokio::spawn(async move {
        machine.follow(readings).await;
    });

    loop {
        let start_time = OffsetDateTime::now_utc();

        refresh_store(&store, &config.snapshot_path).await;
        if *loading.borrow() {
            warn!("Still waiting for the first reading");
        }
        log_history_summary(&store, config.history_limit).await;

        if consumer.is_finished() {
            subscription.unsubscribe();
            return Err("alert consumer stopped unexpectedly".into());
        }

        // Wait until the next poll should start
        let elapsed = duration_to_seconds(OffsetDateTime::now_utc() - start_time);
        let wait_time = config.poll_interval_secs.saturating_sub(elapsed);
        info!(
            "Refreshed at {}, next refresh in {} seconds",
            format_datetime(&start_time),
            wait_time
        );
        sleep(Duration::from_secs(wait_time)).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match MonitorConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    // Run main loop or wait for shutdown signal
    tokio::select! {
        result = main_loop(config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
