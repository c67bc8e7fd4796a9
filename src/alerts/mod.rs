pub mod sink;
pub mod state_machine;

pub use sink::{AlertLog, MemoryAlertLog, PostgresAlertLog};
pub use state_machine::{
    evaluate, AlertState, AlertStateMachine, AlertThresholds, Pollutant, PollutantThresholds,
};
