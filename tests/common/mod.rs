//! Shared helpers for integration tests

use std::time::Duration;

use serde_json::{json, Value};

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Device sample with the given particulate and ozone (ppb) levels
pub fn sample(timestamp: &str, pm25: f64, o3_ppb: f64) -> Value {
    json!({
        "environment": {"temperature": 21.0, "humidity": 45.0, "pressure": 1013.0},
        "gases": {
            "co_ppm": 0.2,
            "o3_ppm": o3_ppb,
            "lpg": 1.0,
            "natural_gas": 1.0,
            "air_quality_ppm": 420.0
        },
        "particulates": {"pm1_ugm3": pm25 / 2.0, "pm25_mgm3": pm25},
        "timestamp": timestamp
    })
}
