use crate::error::{ProcessingError, Result};
use crate::models::{default_region_presets, CycloneSpec, DataType, RegionPreset};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE, DEFAULT_ROW_LIMIT, FIRST_AVAILABLE_YEAR, LAST_AVAILABLE_YEAR,
    OOKLA_BASE_URL,
};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

/// Prefix of environment overrides, e.g. `CONNECTIVITY__EXPORT__ROW_LIMIT=500000`
pub const ENV_PREFIX: &str = "CONNECTIVITY";

/// Looked up in the working directory when no explicit file is given
pub const DEFAULT_CONFIG_NAME: &str = "connectivity";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PathSettings {
    pub data_dir: PathBuf,
    pub ookla_dir: PathBuf,
    pub output_dir: PathBuf,
    pub boundaries_file: PathBuf,
    pub ibtracs_dir: PathBuf,
    pub tracks_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            ookla_dir: data_dir.join("raw").join("ookla"),
            output_dir: data_dir.join("output"),
            boundaries_file: data_dir
                .join("raw")
                .join("natural_earth")
                .join("ne_10m_admin_1_states_provinces.geojson"),
            ibtracs_dir: data_dir.join("raw").join("ibtracs"),
            tracks_dir: data_dir.join("processed").join("tracks"),
            data_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct OoklaSettings {
    #[validate(length(min = 1))]
    pub base_url: String,

    #[validate(length(min = 1))]
    pub data_types: Vec<DataType>,

    #[validate(length(min = 1))]
    pub years: Vec<i32>,

    #[validate(length(min = 1))]
    pub quarters: Vec<u8>,

    pub default_columns: Vec<String>,
}

impl Default for OoklaSettings {
    fn default() -> Self {
        Self {
            base_url: OOKLA_BASE_URL.to_string(),
            data_types: DataType::all().to_vec(),
            years: (FIRST_AVAILABLE_YEAR..=LAST_AVAILABLE_YEAR).collect(),
            quarters: vec![1, 2, 3, 4],
            default_columns: [
                "quadkey",
                "tile",
                "avg_d_kbps",
                "avg_u_kbps",
                "avg_lat_ms",
                "tests",
                "devices",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ExportSettings {
    /// Rows per sheet before splitting
    #[validate(range(min = 1, max = 1_048_575))]
    pub row_limit: usize,

    pub compression: String,

    #[validate(range(min = 1))]
    pub row_group_size: usize,

    /// Concatenate inputs into one export by default
    pub combine: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            row_limit: DEFAULT_ROW_LIMIT,
            compression: COMPRESSION_SNAPPY.to_string(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            combine: false,
        }
    }
}

/// Runtime configuration, loaded once and passed down explicitly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    #[validate(nested)]
    pub paths: PathSettings,

    #[validate(nested)]
    pub ookla: OoklaSettings,

    #[validate(nested)]
    pub export: ExportSettings,

    pub regions: BTreeMap<String, RegionPreset>,

    pub cyclone: Option<CycloneSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: PathSettings::default(),
            ookla: OoklaSettings::default(),
            export: ExportSettings::default(),
            regions: default_region_presets().into_iter().collect(),
            cyclone: None,
        }
    }
}

impl Settings {
    /// Built-in defaults, overlaid by a TOML file and then by
    /// `CONNECTIVITY__SECTION__KEY` environment variables.
    ///
    /// An explicit `config_file` must exist; otherwise `connectivity.toml` in
    /// the working directory is used when present.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);

        builder = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ProcessingError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                debug!("Loading settings from {}", path.display());
                builder.add_source(File::new(&path.to_string_lossy(), FileFormat::Toml))
            }
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate_all()?;
        Ok(settings)
    }

    /// Field validation plus the cross-field checks derive can't express
    pub fn validate_all(&self) -> Result<()> {
        self.validate()?;

        for preset in self.regions.values() {
            preset.validate()?;
        }
        if let Some(cyclone) = &self.cyclone {
            cyclone.validate_all()?;
        }

        let compression = self.export.compression.to_lowercase();
        if ![
            COMPRESSION_SNAPPY,
            COMPRESSION_GZIP,
            COMPRESSION_LZ4,
            COMPRESSION_ZSTD,
            COMPRESSION_NONE,
        ]
        .contains(&compression.as_str())
        {
            return Err(ProcessingError::Config(format!(
                "Invalid compression type: {}",
                self.export.compression
            )));
        }

        if let Some(q) = self.ookla.quarters.iter().find(|q| !(1..=4).contains(*q)) {
            return Err(ProcessingError::Config(format!(
                "Quarter {} not valid, quarters run from 1 to 4",
                q
            )));
        }

        Ok(())
    }

    pub fn region(&self, key: &str) -> Result<&RegionPreset> {
        self.regions
            .get(key)
            .ok_or_else(|| ProcessingError::RegionNotFound(key.to_string()))
    }

    pub fn region_keys(&self) -> Vec<&str> {
        self.regions.keys().map(|k| k.as_str()).collect()
    }

    /// Check a requested period and service type against what upstream publishes
    pub fn validate_period(&self, year: i32, quarter: u8, data_type: DataType) -> Result<()> {
        if !self.ookla.years.contains(&year) {
            return Err(ProcessingError::Config(format!(
                "Year {} not available. Available: {:?}",
                year, self.ookla.years
            )));
        }
        if !self.ookla.quarters.contains(&quarter) {
            return Err(ProcessingError::Config(format!(
                "Quarter {} not valid. Available: {:?}",
                quarter, self.ookla.quarters
            )));
        }
        if !self.ookla.data_types.contains(&data_type) {
            let allowed: Vec<&str> = self.ookla.data_types.iter().map(|t| t.as_str()).collect();
            return Err(ProcessingError::Config(format!(
                "Data type {} not available. Available: {}",
                data_type,
                allowed.join(", ")
            )));
        }
        Ok(())
    }

    /// Upstream object-store prefix holding one period's tiles
    pub fn s3_uri(&self, data_type: DataType, year: i32, quarter: u8) -> String {
        format!(
            "{}/type={}/year={}/quarter={}/",
            self.ookla.base_url.trim_end_matches('/'),
            data_type,
            year,
            quarter
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate_all().is_ok());
        assert_eq!(settings.regions.len(), 7);
        assert_eq!(settings.export.row_limit, 900_000);
        assert_eq!(settings.ookla.years.first(), Some(&2019));
        assert_eq!(settings.ookla.years.last(), Some(&2025));
    }

    #[test]
    fn test_region_lookup() {
        let settings = Settings::default();
        assert_eq!(settings.region("indonesia_java").unwrap().name, "Java Region");
        assert!(matches!(
            settings.region("atlantis"),
            Err(ProcessingError::RegionNotFound(_))
        ));
    }

    #[test]
    fn test_validate_period() {
        let settings = Settings::default();
        assert!(settings.validate_period(2024, 2, DataType::Mobile).is_ok());
        assert!(settings.validate_period(2018, 2, DataType::Mobile).is_err());
        assert!(settings.validate_period(2024, 5, DataType::Fixed).is_err());

        let mut mobile_only = Settings::default();
        mobile_only.ookla.data_types = vec![DataType::Mobile];
        assert!(mobile_only.validate_period(2024, 1, DataType::Fixed).is_err());
    }

    #[test]
    fn test_s3_uri() {
        let settings = Settings::default();
        assert_eq!(
            settings.s3_uri(DataType::Fixed, 2023, 4),
            "s3://ookla-open-data/parquet/performance/type=fixed/year=2023/quarter=4/"
        );
    }

    #[test]
    fn test_invalid_compression_rejected() {
        let mut settings = Settings::default();
        settings.export.compression = "brotli".to_string();
        assert!(matches!(
            settings.validate_all(),
            Err(ProcessingError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[export]
row_limit = 1000
compression = "zstd"

[regions.timor]
name = "Timor Region"
country = "Indonesia"
provinces = ["Nusa Tenggara Timur"]
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.export.row_limit, 1000);
        assert_eq!(settings.export.compression, "zstd");
        assert_eq!(settings.region("timor").unwrap().provinces.len(), 1);
        // built-in presets survive alongside file-defined ones
        assert!(settings.region("indonesia_papua").is_ok());
    }

    #[test]
    fn test_missing_config_file() {
        let result = Settings::load(Some(Path::new("/nonexistent/connectivity.toml")));
        assert!(matches!(result, Err(ProcessingError::Config(_))));
    }
}
