use crate::error::{ProcessingError, Result};
use crate::models::{
    AggregatedBin, AggregatedDataset, DataType, StatSummary, TileColumns, TileDataset, TileRecord,
};
use crate::utils::quadkey::quadkey_to_latlon;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Groups tile measurements into (quadkey, period, service type) bins
pub struct Aggregator {
    max_workers: usize,
}

/// Group identity. Coordinates are keyed by their bit pattern so the key is totally ordered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    quadkey: String,
    year: i32,
    quarter: u8,
    data_type: DataType,
    name: Option<String>,
    region: Option<String>,
    country: Option<String>,
    latitude_bits: u64,
    longitude_bits: u64,
}

#[derive(Debug, Default)]
struct BinAccumulator {
    download_kbps: Vec<f64>,
    upload_kbps: Vec<f64>,
    latency_ms: Vec<f64>,
    download_mbps: Vec<f64>,
    upload_mbps: Vec<f64>,
    tests: u64,
    devices: u64,
}

impl BinAccumulator {
    fn push(&mut self, record: &TileRecord) {
        fn push_value(values: &mut Vec<f64>, value: Option<f64>) {
            if let Some(v) = value.filter(|v| !v.is_nan()) {
                values.push(v);
            }
        }

        push_value(&mut self.download_kbps, record.avg_d_kbps);
        push_value(&mut self.upload_kbps, record.avg_u_kbps);
        push_value(&mut self.latency_ms, record.avg_lat_ms);
        push_value(&mut self.download_mbps, record.avg_d_mbps);
        push_value(&mut self.upload_mbps, record.avg_u_mbps);

        self.tests = self.tests.saturating_add(record.tests.unwrap_or(0));
        self.devices = self.devices.saturating_add(record.devices.unwrap_or(0));
    }

    fn finish(self, key: GroupKey, columns: &TileColumns) -> AggregatedBin {
        let rate = |present: bool, values: &[f64]| present.then(|| StatSummary::from_values(values));

        AggregatedBin {
            quadkey: key.quadkey,
            year: key.year,
            quarter: key.quarter,
            data_type: key.data_type,
            name: key.name,
            region: key.region,
            country: key.country,
            latitude: f64::from_bits(key.latitude_bits),
            longitude: f64::from_bits(key.longitude_bits),
            download_kbps: rate(columns.download_kbps, &self.download_kbps),
            upload_kbps: rate(columns.upload_kbps, &self.upload_kbps),
            latency_ms: columns
                .latency_ms
                .then(|| StatSummary::without_std(&self.latency_ms)),
            download_mbps: rate(columns.download_mbps, &self.download_mbps),
            upload_mbps: rate(columns.upload_mbps, &self.upload_mbps),
            tests_sum: columns.tests.then_some(self.tests),
            devices_sum: columns.devices.then_some(self.devices),
        }
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            max_workers: num_cpus::get(),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Aggregate tile records into bins.
    ///
    /// Records without coordinates get them from their quadkey; a malformed
    /// quadkey fails the whole aggregation. Output rows are ordered by group key.
    pub fn aggregate(&self, dataset: &TileDataset) -> Result<AggregatedDataset> {
        if dataset.is_empty() {
            return Err(ProcessingError::EmptyInput);
        }

        let coordinates = self.resolve_coordinates(&dataset.records)?;
        let columns = dataset.columns;

        let mut groups: BTreeMap<GroupKey, BinAccumulator> = BTreeMap::new();
        for (record, (latitude, longitude)) in dataset.records.iter().zip(coordinates) {
            let key = GroupKey {
                quadkey: record.quadkey.clone(),
                year: record.year,
                quarter: record.quarter,
                data_type: record.data_type,
                name: if columns.name { record.name.clone() } else { None },
                region: if columns.region { record.region.clone() } else { None },
                country: if columns.country { record.country.clone() } else { None },
                latitude_bits: latitude.to_bits(),
                longitude_bits: longitude.to_bits(),
            };
            groups.entry(key).or_default().push(record);
        }

        let bins: Vec<AggregatedBin> = groups
            .into_iter()
            .map(|(key, acc)| acc.finish(key, &columns))
            .collect();

        info!(
            "Aggregated {} records to {} bins ({:.1}%)",
            dataset.len(),
            bins.len(),
            100.0 * bins.len() as f64 / dataset.len() as f64
        );

        Ok(AggregatedDataset::new(columns, bins))
    }

    /// Coordinates for every record, decoding quadkeys where none were given
    fn resolve_coordinates(&self, records: &[TileRecord]) -> Result<Vec<(f64, f64)>> {
        let missing = records
            .iter()
            .filter(|r| r.latitude.is_none() || r.longitude.is_none())
            .count();
        if missing > 0 {
            debug!("Decoding {} quadkeys to tile centers", missing);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        pool.install(|| {
            records
                .par_iter()
                .map(|record| match (record.latitude, record.longitude) {
                    (Some(lat), Some(lon)) => Ok((lat, lon)),
                    _ => quadkey_to_latlon(&record.quadkey),
                })
                .collect::<Result<Vec<_>>>()
        })
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample_records() -> Vec<TileRecord> {
        vec![
            TileRecord::new("1320", 2024, 1, DataType::Mobile)
                .with_speeds(10_000.0, 2_000.0)
                .with_latency(30.0)
                .with_counts(5, 2),
            TileRecord::new("1320", 2024, 1, DataType::Mobile)
                .with_speeds(20_000.0, 4_000.0)
                .with_latency(50.0)
                .with_counts(3, 1),
            TileRecord::new("1320", 2024, 1, DataType::Fixed)
                .with_speeds(50_000.0, 10_000.0)
                .with_latency(10.0)
                .with_counts(7, 4),
            TileRecord::new("1321", 2024, 2, DataType::Mobile)
                .with_speeds(15_000.0, 3_000.0)
                .with_latency(40.0)
                .with_counts(1, 1),
        ]
    }

    #[test]
    fn test_single_row_stats_equal_raw_values() {
        let dataset = TileDataset::from_records(vec![TileRecord::new("0231", 2024, 3, DataType::Mobile)
            .with_speeds(12_345.0, 678.0)
            .with_latency(25.0)
            .with_counts(9, 4)]);

        let result = Aggregator::new().aggregate(&dataset).unwrap();
        assert_eq!(result.len(), 1);

        let bin = &result.bins[0];
        let download = bin.download_kbps.unwrap();
        assert_eq!(download.mean, Some(12_345.0));
        assert_eq!(download.min, Some(12_345.0));
        assert_eq!(download.max, Some(12_345.0));
        assert_eq!(download.std, None);
        assert_eq!(bin.latency_ms.unwrap().mean, Some(25.0));
        assert_eq!(bin.tests_sum, Some(9));
        assert_eq!(bin.devices_sum, Some(4));
    }

    #[test]
    fn test_grouping_and_reductions() {
        let dataset = TileDataset::from_records(sample_records());
        let result = Aggregator::new().with_max_workers(2).aggregate(&dataset).unwrap();

        assert_eq!(result.len(), 3);
        assert!(result.len() <= dataset.len());

        let mobile = result
            .bins
            .iter()
            .find(|b| b.quadkey == "1320" && b.data_type == DataType::Mobile)
            .unwrap();
        let download = mobile.download_kbps.unwrap();
        assert_eq!(download.mean, Some(15_000.0));
        assert_eq!(download.min, Some(10_000.0));
        assert_eq!(download.max, Some(20_000.0));
        assert!((download.std.unwrap() - 7_071.067_811_865_476).abs() < 1e-6);
        assert_eq!(mobile.latency_ms.unwrap().std, None);
        assert_eq!(mobile.tests_sum, Some(8));
        assert_eq!(mobile.devices_sum, Some(3));
    }

    #[test]
    fn test_coordinates_decoded_from_quadkey() {
        let dataset = TileDataset::from_records(vec![
            TileRecord::new("0", 2024, 1, DataType::Mobile).with_speeds(1.0, 1.0)
        ]);
        let result = Aggregator::new().aggregate(&dataset).unwrap();
        let bin = &result.bins[0];
        assert!((bin.latitude - 66.51326).abs() < 0.00001);
        assert!((bin.longitude - -90.0).abs() < 1e-9);
    }

    #[test]
    fn test_supplied_coordinates_are_kept() {
        let dataset = TileDataset::from_records(vec![TileRecord::new("0", 2024, 1, DataType::Mobile)
            .with_speeds(1.0, 1.0)
            .with_coordinates(-6.2, 106.8)]);
        let result = Aggregator::new().aggregate(&dataset).unwrap();
        assert_eq!(result.bins[0].latitude, -6.2);
        assert_eq!(result.bins[0].longitude, 106.8);
    }

    #[test]
    fn test_invalid_quadkey_propagates() {
        let mut records = sample_records();
        records.push(TileRecord::new("13x0", 2024, 1, DataType::Mobile).with_speeds(1.0, 1.0));
        let dataset = TileDataset::from_records(records);

        let result = Aggregator::new().aggregate(&dataset);
        assert!(matches!(result, Err(ProcessingError::InvalidQuadkey { .. })));
    }

    #[test]
    fn test_empty_input_fails() {
        let result = Aggregator::new().aggregate(&TileDataset::default());
        assert!(matches!(result, Err(ProcessingError::EmptyInput)));
    }

    #[test]
    fn test_absent_columns_are_omitted() {
        let dataset = TileDataset::from_records(vec![
            TileRecord::new("2", 2024, 1, DataType::Fixed).with_latency(12.0)
        ]);
        let result = Aggregator::new().aggregate(&dataset).unwrap();
        let bin = &result.bins[0];

        assert!(bin.download_kbps.is_none());
        assert!(bin.upload_kbps.is_none());
        assert!(bin.download_mbps.is_none());
        assert!(bin.tests_sum.is_none());
        assert!(bin.latency_ms.is_some());
        assert!(!result.columns.download_kbps);
    }

    #[test]
    fn test_identity_columns_join_group_key() {
        let records = vec![
            TileRecord::new("1320", 2024, 1, DataType::Mobile)
                .with_speeds(1.0, 1.0)
                .with_region("Aceh", "Sumatra Region", "Indonesia"),
            TileRecord::new("1320", 2024, 1, DataType::Mobile)
                .with_speeds(3.0, 1.0)
                .with_region("Riau", "Sumatra Region", "Indonesia"),
        ];
        let result = Aggregator::new()
            .aggregate(&TileDataset::from_records(records))
            .unwrap();

        assert_eq!(result.len(), 2);
        let names: HashSet<_> = result.bins.iter().filter_map(|b| b.name.clone()).collect();
        assert!(names.contains("Aceh") && names.contains("Riau"));
    }

    #[test]
    fn test_order_independent() {
        let records = sample_records();
        let mut reversed = records.clone();
        reversed.reverse();

        let forward = Aggregator::new()
            .aggregate(&TileDataset::from_records(records))
            .unwrap();
        let backward = Aggregator::new()
            .aggregate(&TileDataset::from_records(reversed))
            .unwrap();

        let as_strings = |bins: &[AggregatedBin]| -> HashSet<String> {
            bins.iter().map(|b| format!("{:?}", b)).collect()
        };
        assert_eq!(as_strings(&forward.bins), as_strings(&backward.bins));
    }
}
