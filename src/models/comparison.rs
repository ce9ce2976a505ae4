use crate::models::{AggregatedBin, Period, TileColumns};
use serde::{Deserialize, Serialize};

/// An aggregated bin compared against the baseline and the previous period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub bin: AggregatedBin,

    pub baseline_d_kbps: Option<f64>,
    pub baseline_u_kbps: Option<f64>,
    pub d_kbps_pct_change: Option<f64>,
    pub u_kbps_pct_change: Option<f64>,

    pub time_period: f64,

    pub prev_year: Option<i32>,
    pub prev_quarter: Option<u8>,
    pub prev_d_kbps: Option<f64>,
    pub prev_u_kbps: Option<f64>,
    pub d_kbps_qoq_change: Option<f64>,
    pub u_kbps_qoq_change: Option<f64>,

    pub is_year_transition: bool,

    pub d_kbps_cumulative_change: Option<f64>,
    pub u_kbps_cumulative_change: Option<f64>,
}

impl ComparisonRecord {
    pub fn quadkey(&self) -> &str {
        &self.bin.quadkey
    }

    pub fn period(&self) -> Period {
        self.bin.period()
    }
}

/// Comparison rows sorted by quadkey then period, with the baseline used
#[derive(Debug, Clone)]
pub struct ComparisonDataset {
    pub baseline: Period,
    pub columns: TileColumns,
    pub records: Vec<ComparisonRecord>,
}

impl ComparisonDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
