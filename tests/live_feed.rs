//! Integration tests for the latest-reading feed running on tokio

mod common;

use std::sync::{Arc, Mutex};

use air_quality_monitor::store::MemoryStore;
use air_quality_monitor::telemetry::{subscribe_latest, watch_latest};
use air_quality_monitor::SensorReading;

use common::{sample, wait_until};

fn recorded() -> (Arc<Mutex<Vec<SensorReading>>>, Arc<Mutex<Vec<bool>>>) {
    (Arc::new(Mutex::new(Vec::new())), Arc::new(Mutex::new(Vec::new())))
}

#[tokio::test]
async fn feed_follows_bucket_rollover() {
    let store = Arc::new(MemoryStore::new());
    store.insert("2024-05-01", "23:59:50", sample("2024-05-01 23:59:50", 8.0, 20.0));

    let (updates, loading) = recorded();
    let (u, l) = (updates.clone(), loading.clone());
    let subscription = subscribe_latest(
        store.clone(),
        move |reading| u.lock().unwrap().push(reading),
        move |flag| l.lock().unwrap().push(flag),
    );

    assert!(wait_until(|| updates.lock().unwrap().len() == 1).await);
    assert_eq!(*loading.lock().unwrap(), vec![true, false]);

    store.insert("2024-05-02", "00:00:00", sample("2024-05-02 00:00:00", 40.0, 20.0));
    assert!(wait_until(|| updates.lock().unwrap().len() == 2).await);
    store.insert("2024-05-03", "00:00:00", sample("2024-05-03 00:00:00", 60.0, 20.0));
    assert!(wait_until(|| updates.lock().unwrap().len() == 3).await);

    // One live inner watch, each predecessor torn down once
    assert_eq!(store.active_watchers(Some("2024-05-01")), 0);
    assert_eq!(store.active_watchers(Some("2024-05-02")), 0);
    assert_eq!(store.active_watchers(Some("2024-05-03")), 1);
    assert_eq!(store.cancelled_watchers(), 2);

    let last = updates.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.timestamp, "2024-05-03 00:00:00");
    assert_eq!(last.pm25, 60.0);

    subscription.closed().await;
    assert_eq!(store.active_watchers(None), 0);
    assert_eq!(store.active_watchers(Some("2024-05-03")), 0);
    assert_eq!(store.cancelled_watchers(), 4);
}

#[tokio::test]
async fn empty_store_reports_not_loading_without_readings() {
    let store = Arc::new(MemoryStore::new());
    let (updates, loading) = recorded();
    let (u, l) = (updates.clone(), loading.clone());
    let subscription = subscribe_latest(
        store.clone(),
        move |reading| u.lock().unwrap().push(reading),
        move |flag| l.lock().unwrap().push(flag),
    );

    assert!(wait_until(|| loading.lock().unwrap().last() == Some(&false)).await);
    assert!(updates.lock().unwrap().is_empty());

    // Data arriving later is still picked up
    store.insert("2024-06-01", "08:00:00", sample("2024-06-01 08:00:00", 5.0, 10.0));
    assert!(wait_until(|| updates.lock().unwrap().len() == 1).await);

    subscription.unsubscribe();
    subscription.unsubscribe();
    subscription.closed().await;
    assert_eq!(store.active_watchers(None), 0);
}

#[tokio::test]
async fn dropping_the_subscription_tears_down_watches() {
    let store = Arc::new(MemoryStore::new());
    store.insert("2024-05-01", "10:00:00", sample("2024-05-01 10:00:00", 5.0, 10.0));

    let feed = watch_latest(store.clone());
    let mut readings = feed.readings.clone();
    readings
        .wait_for(|reading| reading.is_some())
        .await
        .unwrap();
    assert!(wait_until(|| !*feed.loading.borrow()).await);

    drop(feed);
    assert!(wait_until(|| store.active_watchers(None) == 0).await);
    assert!(wait_until(|| store.active_watchers(Some("2024-05-01")) == 0).await);
}
