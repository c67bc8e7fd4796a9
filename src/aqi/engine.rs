/// AQI computation from raw pollutant concentrations
use log::{debug, error};

use super::breakpoints::{BreakpointTable, Location, CO, O3, PM25};

pub const AQI_MAX: u16 = 500;

/// Compute the AQI of a single pollutant against its breakpoint table
///
/// NaN and negative concentrations degrade to 0 so that one faulty sensor
/// channel never blocks the overall index. Concentrations above the table
/// saturate at 500.
///
/// # Arguments
/// * `concentration` - Concentration in the table's unit
/// * `table` - Breakpoint table of the pollutant
///
/// # Returns
/// Integer AQI in 0..=500, rounded half away from zero
pub fn individual_aqi(concentration: f64, table: &BreakpointTable) -> u16 {
    if concentration.is_nan() || concentration < 0.0 {
        return 0;
    }

    match table.locate(concentration) {
        Location::Below => 0,
        Location::Above => AQI_MAX,
        Location::Within(row) if row.c_high == row.c_low => row.aqi_low,
        Location::Within(row) => {
            let slope = f64::from(row.aqi_high - row.aqi_low) / (row.c_high - row.c_low);
            let aqi = slope * (concentration - row.c_low) + f64::from(row.aqi_low);
            (aqi.round() as u16).min(AQI_MAX)
        }
        Location::Gap(lower) => {
            // Sub-precision value that has not reached the next reporting step
            debug!(
                "{} concentration {} between breakpoints, reporting {}",
                table.pollutant, concentration, lower.aqi_high
            );
            lower.aqi_high
        }
        Location::Unmatched => {
            error!(
                "{} concentration {} matched no breakpoint row, table is malformed",
                table.pollutant, concentration
            );
            0
        }
    }
}

/// Truncate toward zero to the given number of decimals
///
/// The small bias absorbs binary representation error, e.g. 0.07 * 1000.
fn truncate_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals);
    let bias = if value < 0.0 { -1e-9 } else { 1e-9 };
    (value * factor + bias).trunc() / factor
}

/// Compute the overall AQI as the maximum of the individual pollutant AQIs
///
/// Inputs are truncated to the reporting precision before lookup: PM2.5 and CO
/// to one decimal, O3 to three.
///
/// # Arguments
/// * `pm25_ugm3` - PM2.5 in µg/m³
/// * `o3_ppm` - Ozone in ppm (callers holding ppb must divide by 1000 first)
/// * `co_ppm` - Carbon monoxide in ppm
pub fn overall_aqi(pm25_ugm3: f64, o3_ppm: f64, co_ppm: f64) -> u16 {
    let pm25 = individual_aqi(truncate_to(pm25_ugm3, 1), &PM25);
    let o3 = individual_aqi(truncate_to(o3_ppm, 3), &O3);
    let co = individual_aqi(truncate_to(co_ppm, 1), &CO);
    pm25.max(o3).max(co)
}

/// Health category of an AQI value, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    pub fn from_aqi(aqi: u16) -> Self {
        match aqi {
            0..=50 => AqiCategory::Good,
            51..=100 => AqiCategory::Moderate,
            101..=150 => AqiCategory::UnhealthyForSensitiveGroups,
            151..=200 => AqiCategory::Unhealthy,
            201..=300 => AqiCategory::VeryUnhealthy,
            _ => AqiCategory::Hazardous,
        }
    }

    /// Position in the six-step scale (0 = Good)
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Good and Moderate are acceptable; everything from sensitive groups up is concerning
    pub fn is_concerning(&self) -> bool {
        self.index() > 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    /// Presentation class consumed by the UI shell
    pub fn css_class(&self) -> &'static str {
        match self {
            AqiCategory::Good => "good",
            AqiCategory::Moderate => "moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "sensitive",
            AqiCategory::Unhealthy => "unhealthy",
            AqiCategory::VeryUnhealthy => "very-unhealthy",
            AqiCategory::Hazardous => "hazardous",
        }
    }
}
