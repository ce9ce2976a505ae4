use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Invalid quadkey '{quadkey}': {reason}")]
    InvalidQuadkey { quadkey: String, reason: String },

    #[error("No baseline period available: {0}")]
    NoBaseline(String),

    #[error("Cannot aggregate an empty input table")]
    EmptyInput,

    #[error("No region boundaries supplied for spatial filtering")]
    NoBoundaries,

    #[error("Region '{0}' not found")]
    RegionNotFound(String),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    pub fn invalid_quadkey(quadkey: &str, reason: impl Into<String>) -> Self {
        ProcessingError::InvalidQuadkey {
            quadkey: quadkey.to_string(),
            reason: reason.into(),
        }
    }
}
