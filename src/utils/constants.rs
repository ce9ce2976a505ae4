/// Service type identifiers used by the upstream dataset
pub const DATA_TYPE_MOBILE: &str = "mobile";
pub const DATA_TYPE_FIXED: &str = "fixed";

/// Upstream dataset location and coverage
pub const OOKLA_BASE_URL: &str = "s3://ookla-open-data/parquet/performance";
pub const FIRST_AVAILABLE_YEAR: i32 = 2019;
pub const LAST_AVAILABLE_YEAR: i32 = 2025;

/// Column names
pub const COL_QUADKEY: &str = "quadkey";
pub const COL_TILE: &str = "tile";
pub const COL_DOWNLOAD_KBPS: &str = "avg_d_kbps";
pub const COL_UPLOAD_KBPS: &str = "avg_u_kbps";
pub const COL_LATENCY_MS: &str = "avg_lat_ms";
pub const COL_DOWNLOAD_MBPS: &str = "avg_d_mbps";
pub const COL_UPLOAD_MBPS: &str = "avg_u_mbps";
pub const COL_TESTS: &str = "tests";
pub const COL_DEVICES: &str = "devices";
pub const COL_YEAR: &str = "year";
pub const COL_QUARTER: &str = "quarter";
pub const COL_DATA_TYPE: &str = "data_type";
pub const COL_NAME: &str = "name";
pub const COL_REGION: &str = "region";
pub const COL_COUNTRY: &str = "country";
pub const COL_LATITUDE: &str = "latitude";
pub const COL_LONGITUDE: &str = "longitude";

/// Kbps to Mbps
pub const KBPS_PER_MBPS: f64 = 1000.0;

/// Spreadsheet export
pub const DEFAULT_ROW_LIMIT: usize = 900_000; // keep under the 1,048,576 row sheet cap
pub const SHEET_ROW_CAP: usize = 1_048_575;

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Boundary GeoJSON properties (Natural Earth admin-1 layout)
pub const BOUNDARY_COUNTRY_PROPERTY: &str = "admin";
pub const BOUNDARY_NAME_PROPERTY: &str = "name";

/// Cyclone track archive
pub const IBTRACS_FILE: &str = "ibtracs.since1980.list.v04r01.csv";
pub const IBTRACS_URL: &str = "https://www.ncei.noaa.gov/data/international-best-track-archive-for-climate-stewardship-ibtracs/v04r01/access/csv/ibtracs.since1980.list.v04r01.csv";
pub const TRACK_INTERVAL_HOURS: i64 = 6;
pub const DEFAULT_MAX_WIND_KTS: f64 = 50.0;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
