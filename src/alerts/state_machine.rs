/// Alert state machine: turns an ordered stream of readings into deduplicated alerts
use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, error, info};
use time::OffsetDateTime;
use tokio::sync::watch;
use uuid::Uuid;

use super::sink::AlertLog;
use crate::aqi::AqiCategory;
use crate::models::{AlertKind, AlertRecord, SensorReading};

/// Pollutants tracked independently of the overall index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pollutant {
    Pm25,
    O3,
}

pub const WATCHED: [Pollutant; 2] = [Pollutant::Pm25, Pollutant::O3];

impl Pollutant {
    /// Value in display units (µg/m³ for PM2.5, ppb for O3)
    pub fn value(&self, reading: &SensorReading) -> f64 {
        match self {
            Pollutant::Pm25 => reading.pm25,
            Pollutant::O3 => reading.o3,
        }
    }

    pub fn kind(&self) -> AlertKind {
        match self {
            Pollutant::Pm25 => AlertKind::Pm25,
            Pollutant::O3 => AlertKind::O3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::O3 => "O3",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "µg/m³",
            Pollutant::O3 => "ppb",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollutantThresholds {
    pub warn: f64,
    pub bad: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub pm25: PollutantThresholds,
    pub o3: PollutantThresholds,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            pm25: PollutantThresholds {
                warn: 35.5,
                bad: 55.5,
            },
            o3: PollutantThresholds {
                warn: 70.0,
                bad: 85.0,
            },
        }
    }
}

impl AlertThresholds {
    pub fn for_pollutant(&self, pollutant: Pollutant) -> PollutantThresholds {
        match pollutant {
            Pollutant::Pm25 => self.pm25,
            Pollutant::O3 => self.o3,
        }
    }
}

/// Session state carried between evaluations
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlertState {
    pub last_aqi_category: Option<AqiCategory>,
    pub pollutant_elevated: BTreeMap<Pollutant, bool>,
}

impl AlertState {
    pub fn is_elevated(&self, pollutant: Pollutant) -> bool {
        self.pollutant_elevated
            .get(&pollutant)
            .copied()
            .unwrap_or(false)
    }
}

fn record(kind: AlertKind, level: &str, value: f64, message: String, cls: &str) -> AlertRecord {
    AlertRecord {
        id: Uuid::new_v4().to_string(),
        ts: OffsetDateTime::now_utc(),
        kind,
        level: level.to_string(),
        value,
        message,
        cls: cls.to_string(),
    }
}

/// Advance the alert state by one reading
///
/// The overall index alerts only when it crosses between acceptable (Good,
/// Moderate) and concerning (everything above); a session starts from an
/// acceptable baseline. Each watched pollutant alerts when it becomes elevated
/// (value >= warn) and when it drops back below warn. Escalating from the warn
/// tier to the bad tier while already elevated does not alert again.
///
/// # Returns
/// The next state and the alerts to emit, in evaluation order
pub fn evaluate(
    reading: &SensorReading,
    state: &AlertState,
    thresholds: &AlertThresholds,
) -> (AlertState, Vec<AlertRecord>) {
    let mut next = state.clone();
    let mut alerts = Vec::new();

    let category = AqiCategory::from_aqi(reading.aqi);
    let was_concerning = state
        .last_aqi_category
        .map_or(false, |previous| previous.is_concerning());
    if category.is_concerning() != was_concerning {
        let message = if category.is_concerning() {
            format!("Air quality is {} (AQI {})", category.label(), reading.aqi)
        } else {
            format!(
                "Air quality is back to {} (AQI {})",
                category.label(),
                reading.aqi
            )
        };
        alerts.push(record(
            AlertKind::Aqi,
            category.label(),
            f64::from(reading.aqi),
            message,
            category.css_class(),
        ));
    }
    next.last_aqi_category = Some(category);

    for pollutant in WATCHED {
        let limits = thresholds.for_pollutant(pollutant);
        let value = pollutant.value(reading);
        let elevated = state.is_elevated(pollutant);

        if !elevated && value >= limits.warn {
            let (level, advice) = if value >= limits.bad {
                ("bad", "unhealthy, avoid exposure")
            } else {
                ("warn", "elevated, sensitive groups should limit exposure")
            };
            alerts.push(record(
                pollutant.kind(),
                level,
                value,
                format!(
                    "{} at {:.1} {}: {}",
                    pollutant.label(),
                    value,
                    pollutant.unit(),
                    advice
                ),
                &format!("alert-{}", level),
            ));
            next.pollutant_elevated.insert(pollutant, true);
        } else if elevated && value < limits.warn {
            alerts.push(record(
                pollutant.kind(),
                "ok",
                value,
                format!(
                    "{} returned to acceptable levels ({:.1} {})",
                    pollutant.label(),
                    value,
                    pollutant.unit()
                ),
                "alert-ok",
            ));
            next.pollutant_elevated.insert(pollutant, false);
        } else {
            next.pollutant_elevated.insert(pollutant, elevated);
        }
    }

    (next, alerts)
}

/// Owns the alert state of one monitoring session
///
/// `process` takes `&mut self`, so readings are evaluated strictly one at a time.
pub struct AlertStateMachine {
    state: AlertState,
    thresholds: AlertThresholds,
    log: Arc<dyn AlertLog>,
}

impl AlertStateMachine {
    pub fn new(thresholds: AlertThresholds, log: Arc<dyn AlertLog>) -> Self {
        Self {
            state: AlertState::default(),
            thresholds,
            log,
        }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    /// Evaluate one reading and append its alerts to the log
    ///
    /// Log failures are reported and otherwise ignored: the alert was decided
    /// and the state has already moved on.
    pub async fn process(&mut self, reading: &SensorReading) -> Vec<AlertRecord> {
        let (next, alerts) = evaluate(reading, &self.state, &self.thresholds);
        self.state = next;

        for alert in &alerts {
            info!("[{}] {} ({})", alert.kind.as_str(), alert.message, alert.level);
            if let Err(e) = self.log.append(alert).await {
                error!("Failed to record alert {}: {}", alert.id, e);
            }
        }
        alerts
    }

    /// Process readings from a live feed until its sender goes away
    ///
    /// Only the newest reading is taken each time the consumer is ready.
    pub async fn follow(&mut self, mut readings: watch::Receiver<Option<SensorReading>>) {
        while readings.changed().await.is_ok() {
            let latest = readings.borrow_and_update().clone();
            if let Some(reading) = latest {
                debug!("Evaluating reading at {} (AQI {})", reading.timestamp, reading.aqi);
                self.process(&reading).await;
            }
        }
        debug!("Live feed closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::sink::MemoryAlertLog;

    fn reading(aqi: u16, pm25: f64, o3: f64) -> SensorReading {
        SensorReading {
            aqi,
            co2: 0.0,
            o3,
            co: 0.0,
            glp: 0.0,
            natural_gas: 0.0,
            pm1: 0.0,
            pm25,
            rh: 0.0,
            temperature: 0.0,
            pressure: 0.0,
            pressure_label: "0.0 hPa".into(),
            timestamp: String::new(),
        }
    }

    fn run(sequence: &[SensorReading]) -> Vec<Vec<AlertRecord>> {
        let thresholds = AlertThresholds::default();
        let mut state = AlertState::default();
        sequence
            .iter()
            .map(|r| {
                let (next, alerts) = evaluate(r, &state, &thresholds);
                state = next;
                alerts
            })
            .collect()
    }

    #[test]
    fn aqi_alerts_only_on_macro_flips() {
        let steps = run(&[
            reading(40, 0.0, 0.0),
            reading(120, 0.0, 0.0),
            reading(180, 0.0, 0.0),
            reading(90, 0.0, 0.0),
        ]);

        let counts: Vec<_> = steps.iter().map(Vec::len).collect();
        assert_eq!(counts, vec![0, 1, 0, 1]);
        assert_eq!(steps[1][0].kind, AlertKind::Aqi);
        assert_eq!(steps[1][0].level, "Unhealthy for Sensitive Groups");
        assert_eq!(steps[3][0].cls, "moderate");
    }

    #[test]
    fn session_starting_in_bad_air_alerts() {
        let steps = run(&[reading(160, 0.0, 0.0)]);
        assert_eq!(steps[0].len(), 1);
        assert_eq!(steps[0][0].cls, "unhealthy");
    }

    #[test]
    fn pm25_tracks_only_the_elevated_edge() {
        let steps = run(&[
            reading(0, 10.0, 0.0),
            reading(0, 40.0, 0.0),
            reading(0, 60.0, 0.0),
            reading(0, 30.0, 0.0),
        ]);

        assert!(steps[0].is_empty());
        assert_eq!(steps[1].len(), 1);
        assert_eq!(steps[1][0].kind, AlertKind::Pm25);
        assert_eq!(steps[1][0].level, "warn");
        assert!(steps[2].is_empty());
        assert_eq!(steps[3].len(), 1);
        assert_eq!(steps[3][0].level, "ok");
        assert!(steps[3][0].message.contains("returned to acceptable"));
    }

    #[test]
    fn entering_straight_into_bad_tier() {
        let steps = run(&[reading(0, 0.0, 90.0)]);
        assert_eq!(steps[0].len(), 1);
        assert_eq!(steps[0][0].kind, AlertKind::O3);
        assert_eq!(steps[0][0].level, "bad");
        assert_eq!(steps[0][0].cls, "alert-bad");
    }

    #[test]
    fn identical_reading_is_idempotent() {
        let thresholds = AlertThresholds::default();
        let r = reading(130, 40.0, 75.0);
        let (first, alerts) = evaluate(&r, &AlertState::default(), &thresholds);
        assert_eq!(alerts.len(), 3);

        let (second, alerts) = evaluate(&r, &first, &thresholds);
        assert!(alerts.is_empty());
        assert_eq!(second, first);
    }

    #[test]
    fn boundary_oscillation_alerts_every_time() {
        let steps = run(&[
            reading(0, 35.5, 0.0),
            reading(0, 35.4, 0.0),
            reading(0, 35.5, 0.0),
        ]);
        assert!(steps.iter().all(|alerts| alerts.len() == 1));
    }

    #[test]
    fn alerts_get_unique_ids() {
        let (_, alerts) = evaluate(
            &reading(200, 60.0, 90.0),
            &AlertState::default(),
            &AlertThresholds::default(),
        );
        assert_eq!(alerts.len(), 3);
        assert_ne!(alerts[0].id, alerts[1].id);
        assert_ne!(alerts[1].id, alerts[2].id);
    }

    #[tokio::test]
    async fn machine_appends_in_evaluation_order() {
        let log = Arc::new(MemoryAlertLog::new());
        let mut machine = AlertStateMachine::new(AlertThresholds::default(), log.clone());

        machine.process(&reading(120, 40.0, 0.0)).await;
        machine.process(&reading(120, 40.0, 0.0)).await;
        machine.process(&reading(40, 10.0, 0.0)).await;

        let kinds: Vec<_> = log.records().iter().map(|a| (a.kind, a.level.clone())).collect();
        assert_eq!(
            kinds,
            vec![
                (AlertKind::Aqi, "Unhealthy for Sensitive Groups".to_string()),
                (AlertKind::Pm25, "warn".to_string()),
                (AlertKind::Aqi, "Good".to_string()),
                (AlertKind::Pm25, "ok".to_string()),
            ]
        );
        assert!(!machine.state().is_elevated(Pollutant::Pm25));
    }
}
