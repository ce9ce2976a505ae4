use crate::models::{AggregatedDataset, DataType, Period, TileDataset};
use std::collections::BTreeMap;

/// Overview of a prepared dataset: volumes, periods, service types and speeds
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub raw_records: usize,
    pub aggregated_bins: usize,
    pub region: Option<String>,
    pub periods: BTreeMap<Period, usize>,
    pub data_types: BTreeMap<DataType, usize>,
    pub mean_download_mbps: Option<f64>,
    pub mean_upload_mbps: Option<f64>,
    pub total_tests: Option<u64>,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

impl DatasetSummary {
    pub fn new(raw: &TileDataset, aggregated: &AggregatedDataset) -> Self {
        let mut data_types = BTreeMap::new();
        for record in &raw.records {
            *data_types.entry(record.data_type).or_insert(0) += 1;
        }

        let columns = raw.columns;
        Self {
            raw_records: raw.len(),
            aggregated_bins: aggregated.len(),
            region: raw.region_name().map(|r| r.to_string()),
            periods: raw.period_counts(),
            data_types,
            mean_download_mbps: columns
                .download_mbps
                .then(|| mean(raw.records.iter().filter_map(|r| r.avg_d_mbps)))
                .flatten(),
            mean_upload_mbps: columns
                .upload_mbps
                .then(|| mean(raw.records.iter().filter_map(|r| r.avg_u_mbps)))
                .flatten(),
            total_tests: columns
                .tests
                .then(|| {
                    raw.records
                        .iter()
                        .filter_map(|r| r.tests)
                        .fold(0u64, u64::saturating_add)
                }),
        }
    }

    /// Bins as a percentage of raw records
    pub fn compression_ratio(&self) -> f64 {
        if self.raw_records == 0 {
            0.0
        } else {
            100.0 * self.aggregated_bins as f64 / self.raw_records as f64
        }
    }

    pub fn render(&self) -> String {
        let mut summary = String::new();

        summary.push_str("SUMMARY STATISTICS\n");
        summary.push_str("==================\n\n");

        summary.push_str(&format!(
            "Data Overview:\n\
            - Raw records: {}\n\
            - Aggregated bins: {}\n\
            - Compression ratio: {:.1}%\n",
            self.raw_records,
            self.aggregated_bins,
            self.compression_ratio()
        ));
        if let Some(region) = &self.region {
            summary.push_str(&format!("- Region: {}\n", region));
        }

        if !self.periods.is_empty() {
            summary.push_str("\nTime Periods:\n");
            for (period, count) in &self.periods {
                summary.push_str(&format!("- {}: {} records\n", period, count));
            }
        }

        if !self.data_types.is_empty() {
            summary.push_str("\nData Types:\n");
            for (data_type, count) in &self.data_types {
                summary.push_str(&format!("- {}: {} records\n", data_type, count));
            }
        }

        if self.mean_download_mbps.is_some() || self.mean_upload_mbps.is_some() {
            let fmt = |v: Option<f64>| {
                v.map(|v| format!("{:.2} Mbps", v))
                    .unwrap_or_else(|| "N/A".to_string())
            };
            summary.push_str(&format!(
                "\nAverage Speeds:\n\
                - Download: {}\n\
                - Upload: {}\n",
                fmt(self.mean_download_mbps),
                fmt(self.mean_upload_mbps)
            ));
        }

        if let Some(tests) = self.total_tests {
            summary.push_str(&format!("\nTotal Tests: {}\n", tests));
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TileRecord;
    use crate::processors::Aggregator;

    #[test]
    fn test_summary_counts() {
        let mut records = vec![
            TileRecord::new("1320", 2024, 2, DataType::Mobile)
                .with_speeds(10_000.0, 2_000.0)
                .with_counts(5, 2)
                .with_region("Bali", "Bali and Nusa Tenggara Region", "Indonesia"),
            TileRecord::new("1320", 2024, 1, DataType::Fixed)
                .with_speeds(30_000.0, 4_000.0)
                .with_counts(3, 1)
                .with_region("Bali", "Bali and Nusa Tenggara Region", "Indonesia"),
            TileRecord::new("1321", 2024, 1, DataType::Mobile)
                .with_speeds(20_000.0, 6_000.0)
                .with_counts(2, 1)
                .with_region("Bali", "Bali and Nusa Tenggara Region", "Indonesia"),
        ];
        records.iter_mut().for_each(|r| r.derive_mbps());
        let raw = TileDataset::from_records(records);
        let bins = Aggregator::new().aggregate(&raw).unwrap();

        let summary = DatasetSummary::new(&raw, &bins);
        assert_eq!(summary.raw_records, 3);
        assert_eq!(summary.aggregated_bins, 3);
        assert_eq!(summary.total_tests, Some(10));
        assert_eq!(summary.mean_download_mbps, Some(20.0));
        assert_eq!(summary.mean_upload_mbps, Some(4.0));
        assert_eq!(summary.data_types.get(&DataType::Mobile), Some(&2));

        let periods: Vec<_> = summary.periods.keys().copied().collect();
        assert_eq!(periods, vec![Period::new(2024, 1), Period::new(2024, 2)]);

        let report = summary.render();
        assert!(report.contains("Compression ratio: 100.0%"));
        assert!(report.contains("Region: Bali and Nusa Tenggara Region"));
        assert!(report.contains("2024 Q1: 2 records"));
        assert!(report.contains("Download: 20.00 Mbps"));
    }

    #[test]
    fn test_total_tests_saturates() {
        let records = vec![
            TileRecord::new("1320", 2024, 1, DataType::Mobile).with_counts(u64::MAX, 1),
            TileRecord::new("1321", 2024, 1, DataType::Mobile).with_counts(5, 1),
        ];
        let raw = TileDataset::from_records(records);
        let bins = Aggregator::new().aggregate(&raw).unwrap();

        let summary = DatasetSummary::new(&raw, &bins);
        assert_eq!(summary.total_tests, Some(u64::MAX));
    }
}
