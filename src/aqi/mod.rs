pub mod breakpoints;
pub mod engine;

pub use breakpoints::{Breakpoint, BreakpointTable, CO, O3, PM25};
pub use engine::{individual_aqi, overall_aqi, AqiCategory};
