use crate::error::{ProcessingError, Result};
use crate::models::Period;
use crate::utils::constants::{DATA_TYPE_FIXED, DATA_TYPE_MOBILE, KBPS_PER_MBPS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Network service type a measurement was taken on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Mobile,
    Fixed,
}

impl DataType {
    pub fn all() -> [DataType; 2] {
        [DataType::Mobile, DataType::Fixed]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Mobile => DATA_TYPE_MOBILE,
            DataType::Fixed => DATA_TYPE_FIXED,
        }
    }

    /// Sheet label used when exporting one service type
    pub fn sheet_name(&self) -> &'static str {
        match self {
            DataType::Mobile => "Mobile",
            DataType::Fixed => "Fixed",
        }
    }
}

impl FromStr for DataType {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            DATA_TYPE_MOBILE => Ok(DataType::Mobile),
            DATA_TYPE_FIXED => Ok(DataType::Fixed),
            other => Err(ProcessingError::InvalidFormat(format!(
                "Unknown data type '{}', expected one of: {}, {}",
                other, DATA_TYPE_MOBILE, DATA_TYPE_FIXED
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One tile's measurements for one period and service type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TileRecord {
    #[validate(length(min = 1))]
    pub quadkey: String,

    pub avg_d_kbps: Option<f64>,
    pub avg_u_kbps: Option<f64>,
    pub avg_lat_ms: Option<f64>,
    pub avg_d_mbps: Option<f64>,
    pub avg_u_mbps: Option<f64>,

    pub tests: Option<u64>,
    pub devices: Option<u64>,

    pub year: i32,

    #[validate(range(min = 1, max = 4))]
    pub quarter: u8,

    pub data_type: DataType,

    pub name: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

impl TileRecord {
    pub fn new(quadkey: impl Into<String>, year: i32, quarter: u8, data_type: DataType) -> Self {
        Self {
            quadkey: quadkey.into(),
            avg_d_kbps: None,
            avg_u_kbps: None,
            avg_lat_ms: None,
            avg_d_mbps: None,
            avg_u_mbps: None,
            tests: None,
            devices: None,
            year,
            quarter,
            data_type,
            name: None,
            region: None,
            country: None,
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_speeds(mut self, download_kbps: f64, upload_kbps: f64) -> Self {
        self.avg_d_kbps = Some(download_kbps);
        self.avg_u_kbps = Some(upload_kbps);
        self
    }

    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.avg_lat_ms = Some(latency_ms);
        self
    }

    pub fn with_counts(mut self, tests: u64, devices: u64) -> Self {
        self.tests = Some(tests);
        self.devices = Some(devices);
        self
    }

    pub fn with_region(mut self, name: &str, region: &str, country: &str) -> Self {
        self.name = Some(name.to_string());
        self.region = Some(region.to_string());
        self.country = Some(country.to_string());
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Fill the Mbps columns from the Kbps ones
    pub fn derive_mbps(&mut self) {
        self.avg_d_mbps = self.avg_d_kbps.map(|v| v / KBPS_PER_MBPS);
        self.avg_u_mbps = self.avg_u_kbps.map(|v| v / KBPS_PER_MBPS);
    }

    pub fn period(&self) -> Period {
        Period::new(self.year, self.quarter)
    }
}

/// Which optional columns a tile table carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileColumns {
    pub download_kbps: bool,
    pub upload_kbps: bool,
    pub latency_ms: bool,
    pub download_mbps: bool,
    pub upload_mbps: bool,
    pub tests: bool,
    pub devices: bool,
    pub name: bool,
    pub region: bool,
    pub country: bool,
}

impl TileColumns {
    /// Measure columns are present when any record has a value; identity
    /// columns only when every record has one.
    pub fn infer(records: &[TileRecord]) -> Self {
        let any = |f: fn(&TileRecord) -> bool| records.iter().any(f);
        let every = |f: fn(&TileRecord) -> bool| !records.is_empty() && records.iter().all(f);

        Self {
            download_kbps: any(|r| r.avg_d_kbps.is_some()),
            upload_kbps: any(|r| r.avg_u_kbps.is_some()),
            latency_ms: any(|r| r.avg_lat_ms.is_some()),
            download_mbps: any(|r| r.avg_d_mbps.is_some()),
            upload_mbps: any(|r| r.avg_u_mbps.is_some()),
            tests: any(|r| r.tests.is_some()),
            devices: any(|r| r.devices.is_some()),
            name: every(|r| r.name.is_some()),
            region: every(|r| r.region.is_some()),
            country: every(|r| r.country.is_some()),
        }
    }

    /// Columns of a concatenation of two tables
    pub fn union(self, other: TileColumns) -> Self {
        Self {
            download_kbps: self.download_kbps || other.download_kbps,
            upload_kbps: self.upload_kbps || other.upload_kbps,
            latency_ms: self.latency_ms || other.latency_ms,
            download_mbps: self.download_mbps || other.download_mbps,
            upload_mbps: self.upload_mbps || other.upload_mbps,
            tests: self.tests || other.tests,
            devices: self.devices || other.devices,
            name: self.name || other.name,
            region: self.region || other.region,
            country: self.country || other.country,
        }
    }

    /// Columns carried by region-filtered output
    pub fn with_region_metadata(mut self) -> Self {
        self.name = true;
        self.region = true;
        self.country = true;
        self.download_mbps = self.download_kbps;
        self.upload_mbps = self.upload_kbps;
        self
    }
}

/// A table of tile records with its column layout
#[derive(Debug, Clone, Default)]
pub struct TileDataset {
    pub columns: TileColumns,
    pub records: Vec<TileRecord>,
}

impl TileDataset {
    pub fn new(columns: TileColumns, records: Vec<TileRecord>) -> Self {
        Self { columns, records }
    }

    pub fn from_records(records: Vec<TileRecord>) -> Self {
        Self {
            columns: TileColumns::infer(&records),
            records,
        }
    }

    /// Concatenate tables, keeping the union of their columns
    pub fn concat(datasets: Vec<TileDataset>) -> Self {
        let mut combined = TileDataset::default();
        for (i, dataset) in datasets.into_iter().enumerate() {
            combined.columns = if i == 0 {
                dataset.columns
            } else {
                combined.columns.union(dataset.columns)
            };
            combined.records.extend(dataset.records);
        }
        combined
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record counts per period, in chronological order
    pub fn period_counts(&self) -> BTreeMap<Period, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.period()).or_insert(0) += 1;
        }
        counts
    }

    /// Region label of the first record, if any
    pub fn region_name(&self) -> Option<&str> {
        self.records.first().and_then(|r| r.region.as_deref())
    }
}

/// A tile row from the global upstream dataset, before regional filtering
#[derive(Debug, Clone, PartialEq)]
pub struct RawTile {
    pub quadkey: String,
    pub tile_wkt: Option<String>,
    pub avg_d_kbps: Option<f64>,
    pub avg_u_kbps: Option<f64>,
    pub avg_lat_ms: Option<f64>,
    pub tests: Option<u64>,
    pub devices: Option<u64>,
}

impl RawTile {
    pub fn new(quadkey: impl Into<String>) -> Self {
        Self {
            quadkey: quadkey.into(),
            tile_wkt: None,
            avg_d_kbps: None,
            avg_u_kbps: None,
            avg_lat_ms: None,
            tests: None,
            devices: None,
        }
    }
}

/// Raw tiles with the measure columns their source carried
#[derive(Debug, Clone, Default)]
pub struct RawTileTable {
    pub columns: TileColumns,
    pub tiles: Vec<RawTile>,
}
