use crate::models::DataType;
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};

/// Lowercase a region name and replace spaces with underscores
pub fn region_slug(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Local calendar date used to stamp output files
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Filtered tile file name: {region}_{year}_Q{quarter}_{type}_{YYYYMMDD}.parquet
pub fn filtered_tiles_filename(
    region_name: &str,
    year: i32,
    quarter: u8,
    data_type: DataType,
    date: NaiveDate,
) -> String {
    format!(
        "{}_{}_Q{}_{}_{}.parquet",
        region_slug(region_name),
        year,
        quarter,
        data_type,
        date.format("%Y%m%d")
    )
}

/// Default location for a filtered tile file inside the data directory
pub fn default_filtered_tiles_path(
    data_dir: &Path,
    region_name: &str,
    year: i32,
    quarter: u8,
    data_type: DataType,
) -> PathBuf {
    data_dir.join(filtered_tiles_filename(
        region_name,
        year,
        quarter,
        data_type,
        today(),
    ))
}

/// Base name for combined exports: {region}_tableau_{YYYYMMDD} or ookla_tableau_{YYYYMMDD}
pub fn combined_output_name(region_name: Option<&str>, date: NaiveDate) -> String {
    let prefix = region_name
        .map(region_slug)
        .unwrap_or_else(|| "ookla".to_string());
    format!("{}_tableau_{}", prefix, date.format("%Y%m%d"))
}

/// Identifier of a cyclone analysis, e.g. "seroja_2021"
pub fn cyclone_analysis_id(name: &str, year: i32) -> String {
    format!("{}_{}", region_slug(name), year)
}

/// Track file name for an extracted or synthesized track
pub fn track_filename(analysis_id: &str, synthetic: bool) -> String {
    if synthetic {
        format!("{}_track_synthetic.csv", analysis_id)
    } else {
        format!("{}_track.csv", analysis_id)
    }
}
