/// EPA breakpoint tables for the pollutants that contribute to the overall AQI
///
/// Concentration bounds are expressed at the reporting precision of each
/// pollutant, so consecutive rows leave a gap of exactly one reporting step
/// (e.g. 12.0 then 12.1 for PM2.5). Inputs truncated to that precision never
/// fall inside a gap.

/// One row of a breakpoint table: a concentration range mapped to an AQI range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub aqi_low: u16,
    pub aqi_high: u16,
    pub c_low: f64,
    pub c_high: f64,
}

const fn bp(aqi_low: u16, aqi_high: u16, c_low: f64, c_high: f64) -> Breakpoint {
    Breakpoint {
        aqi_low,
        aqi_high,
        c_low,
        c_high,
    }
}

/// Ordered breakpoints for a single pollutant
#[derive(Debug, Clone, Copy)]
pub struct BreakpointTable {
    pub pollutant: &'static str,
    rows: &'static [Breakpoint],
}

/// Where a concentration lands relative to a table
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Location<'a> {
    /// Inside `[c_low, c_high]` of a row (both ends inclusive)
    Within(&'a Breakpoint),
    /// Between two rows, below the reporting step of the upper one; carries the lower row
    Gap(&'a Breakpoint),
    Below,
    Above,
    /// Not found although inside the declared range; the table is malformed
    Unmatched,
}

/// PM2.5 24-hour average, µg/m³ (1 decimal)
pub const PM25: BreakpointTable = BreakpointTable {
    pollutant: "pm25",
    rows: &[
        bp(0, 50, 0.0, 12.0),
        bp(51, 100, 12.1, 35.4),
        bp(101, 150, 35.5, 55.4),
        bp(151, 200, 55.5, 150.4),
        bp(201, 300, 150.5, 250.4),
        bp(301, 400, 250.5, 350.4),
        bp(401, 500, 350.5, 500.4),
    ],
};

/// Ozone 8-hour average, ppm (3 decimals); the upper rows use the 1-hour ranges
pub const O3: BreakpointTable = BreakpointTable {
    pollutant: "o3",
    rows: &[
        bp(0, 50, 0.000, 0.054),
        bp(51, 100, 0.055, 0.070),
        bp(101, 150, 0.071, 0.085),
        bp(151, 200, 0.086, 0.105),
        bp(201, 300, 0.106, 0.200),
        bp(301, 400, 0.201, 0.504),
        bp(401, 500, 0.505, 0.604),
    ],
};

/// Carbon monoxide 8-hour average, ppm (1 decimal)
pub const CO: BreakpointTable = BreakpointTable {
    pollutant: "co",
    rows: &[
        bp(0, 50, 0.0, 4.4),
        bp(51, 100, 4.5, 9.4),
        bp(101, 150, 9.5, 12.4),
        bp(151, 200, 12.5, 15.4),
        bp(201, 300, 15.5, 30.4),
        bp(301, 400, 30.5, 40.4),
        bp(401, 500, 40.5, 50.4),
    ],
};

impl BreakpointTable {
    pub const fn new(pollutant: &'static str, rows: &'static [Breakpoint]) -> Self {
        Self { pollutant, rows }
    }

    pub fn rows(&self) -> &'static [Breakpoint] {
        self.rows
    }

    pub fn min_concentration(&self) -> f64 {
        self.rows.first().map(|row| row.c_low).unwrap_or(0.0)
    }

    pub fn max_concentration(&self) -> f64 {
        self.rows.last().map(|row| row.c_high).unwrap_or(0.0)
    }

    /// Locate a (non-negative, finite) concentration in the table
    pub fn locate(&self, concentration: f64) -> Location<'static> {
        if concentration < self.min_concentration() {
            return Location::Below;
        }
        if concentration > self.max_concentration() {
            return Location::Above;
        }

        let mut previous: Option<&'static Breakpoint> = None;
        for row in self.rows {
            if concentration >= row.c_low && concentration <= row.c_high {
                return Location::Within(row);
            }
            if concentration < row.c_low {
                if let Some(lower) = previous {
                    return Location::Gap(lower);
                }
            }
            previous = Some(row);
        }

        Location::Unmatched
    }

    /// Rows are contiguous at reporting precision and ascending in both AQI and concentration
    pub fn is_well_formed(&self, step: f64) -> bool {
        let ascending = self
            .rows
            .iter()
            .all(|row| row.c_low <= row.c_high && row.aqi_low <= row.aqi_high);
        let contiguous = self.rows.windows(2).all(|pair| {
            let (lower, upper) = (&pair[0], &pair[1]);
            upper.aqi_low == lower.aqi_high + 1
                && (upper.c_low - lower.c_high - step).abs() < step / 10.0
        });
        ascending && contiguous
    }
}
