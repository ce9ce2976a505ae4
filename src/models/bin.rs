use crate::models::{DataType, Period, TileColumns};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Statistical reduction of one measurement column within a bin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatSummary {
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std: Option<f64>,
}

impl StatSummary {
    /// Mean, min, max and sample standard deviation of the non-null values
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let std = if values.len() > 1 {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            Some(variance.sqrt())
        } else {
            None
        };

        Self {
            mean: Some(mean),
            min: Some(min),
            max: Some(max),
            std,
        }
    }

    /// Same as `from_values` without the spread statistic
    pub fn without_std(values: &[f64]) -> Self {
        Self {
            std: None,
            ..Self::from_values(values)
        }
    }
}

/// One aggregated reporting bin: a quadkey in a period for a service type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedBin {
    pub quadkey: String,
    pub year: i32,
    pub quarter: u8,
    pub data_type: DataType,
    pub name: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,

    pub download_kbps: Option<StatSummary>,
    pub upload_kbps: Option<StatSummary>,
    pub latency_ms: Option<StatSummary>,
    pub download_mbps: Option<StatSummary>,
    pub upload_mbps: Option<StatSummary>,

    pub tests_sum: Option<u64>,
    pub devices_sum: Option<u64>,
}

impl AggregatedBin {
    pub fn period(&self) -> Period {
        Period::new(self.year, self.quarter)
    }

    pub fn download_mean(&self) -> Option<f64> {
        self.download_kbps.and_then(|s| s.mean)
    }

    pub fn upload_mean(&self) -> Option<f64> {
        self.upload_kbps.and_then(|s| s.mean)
    }
}

/// Aggregated bins with the column layout of the table they came from
#[derive(Debug, Clone, Default)]
pub struct AggregatedDataset {
    pub columns: TileColumns,
    pub bins: Vec<AggregatedBin>,
}

impl AggregatedDataset {
    pub fn new(columns: TileColumns, bins: Vec<AggregatedBin>) -> Self {
        Self { columns, bins }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Distinct periods present, in chronological order
    pub fn periods(&self) -> BTreeSet<Period> {
        self.bins.iter().map(|b| b.period()).collect()
    }

    /// Bins of one service type, keeping the column layout
    pub fn filter_data_type(&self, data_type: DataType) -> AggregatedDataset {
        AggregatedDataset {
            columns: self.columns,
            bins: self
                .bins
                .iter()
                .filter(|b| b.data_type == data_type)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value_summary() {
        let summary = StatSummary::from_values(&[42.0]);
        assert_eq!(summary.mean, Some(42.0));
        assert_eq!(summary.min, Some(42.0));
        assert_eq!(summary.max, Some(42.0));
        assert_eq!(summary.std, None);
    }

    #[test]
    fn test_sample_standard_deviation() {
        let summary = StatSummary::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(summary.mean, Some(5.0));
        assert_eq!(summary.min, Some(2.0));
        assert_eq!(summary.max, Some(9.0));
        // sum of squared deviations is 32, n - 1 = 7
        assert!((summary.std.unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_summary_is_null() {
        assert_eq!(StatSummary::from_values(&[]), StatSummary::default());
        assert_eq!(StatSummary::without_std(&[1.0, 3.0]).std, None);
    }
}
