//! End-to-end: store -> live feed -> alert state machine -> alert log

mod common;

use std::sync::Arc;

use air_quality_monitor::alerts::{AlertStateMachine, AlertThresholds, MemoryAlertLog};
use air_quality_monitor::store::MemoryStore;
use air_quality_monitor::telemetry::{fetch_history, watch_latest};
use air_quality_monitor::AlertKind;

use common::{sample, wait_until};

#[tokio::test]
async fn readings_flow_into_deduplicated_alerts() {
    let store = Arc::new(MemoryStore::new());
    store.insert("2024-05-01", "10:00:00", sample("2024-05-01 10:00:00", 10.0, 20.0));

    let log = Arc::new(MemoryAlertLog::new());
    let feed = watch_latest(store.clone());
    let mut machine = AlertStateMachine::new(AlertThresholds::default(), log.clone());
    let readings = feed.readings.clone();
    let consumer = tokio::spawn(async move {
        machine.follow(readings).await;
        machine
    });

    // Clean air: nothing to report
    let mut readings = feed.readings.clone();
    readings.wait_for(|r| r.is_some()).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(log.is_empty());

    // PM2.5 40 µg/m³ -> AQI 112: macro flip plus pm25 elevated
    store.insert("2024-05-01", "10:00:05", sample("2024-05-01 10:00:05", 40.0, 20.0));
    assert!(wait_until(|| log.len() == 2).await);

    // Still concerning and still elevated, only deeper: no new alerts
    store.insert("2024-05-01", "10:00:10", sample("2024-05-01 10:00:10", 60.0, 20.0));
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(log.len(), 2);

    // Recovery on both edges
    store.insert("2024-05-01", "10:00:15", sample("2024-05-01 10:00:15", 30.0, 20.0));
    assert!(wait_until(|| log.len() == 4).await);

    let records = log.records();
    assert_eq!(records[0].kind, AlertKind::Aqi);
    assert_eq!(records[1].kind, AlertKind::Pm25);
    assert_eq!(records[1].level, "warn");
    assert_eq!(records[2].kind, AlertKind::Aqi);
    assert_eq!(records[2].cls, "moderate");
    assert_eq!(records[3].level, "ok");

    drop(feed);
    let machine = consumer.await.unwrap();
    assert_eq!(
        machine.state().last_aqi_category.map(|c| c.index()),
        Some(1)
    );

    let history = fetch_history(store.as_ref(), "2024-05-01", 10).await.unwrap();
    let aqis: Vec<_> = history.iter().map(|p| p.aqi).collect();
    assert_eq!(aqis.len(), 4);
    assert!(aqis[1] > 100 && aqis[2] > aqis[1] && aqis[3] <= 100);
}

#[test]
fn alert_records_serialize_with_type_key_and_iso_timestamp() {
    use air_quality_monitor::alerts::{evaluate, AlertState};
    use air_quality_monitor::telemetry::decode_value;

    let reading = decode_value(&sample("2024-05-01 10:00:00", 70.0, 20.0), "10:00:00");
    let (_, alerts) = evaluate(&reading, &AlertState::default(), &AlertThresholds::default());

    let json = serde_json::to_value(&alerts[0]).unwrap();
    assert_eq!(json["type"], "aqi");
    let ts = json["ts"].as_str().unwrap();
    assert!(air_quality_monitor::utils::parse_timestamp(ts).is_some());
}
