use serde::{Deserialize, Serialize};
use std::fmt;

/// A (year, quarter) reporting period. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub quarter: u8,
}

impl Period {
    pub fn new(year: i32, quarter: u8) -> Self {
        Self { year, quarter }
    }

    /// Sequential index where consecutive quarters differ by one across years
    pub fn index(&self) -> i64 {
        self.year as i64 * 4 + self.quarter as i64
    }

    /// Decimal period label, e.g. 2019.0, 2019.25 ... 2019.75
    pub fn time_period(&self) -> f64 {
        self.year as f64 + (self.quarter as f64 - 1.0) * 0.25
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Q{}", self.year, self.quarter)
    }
}
