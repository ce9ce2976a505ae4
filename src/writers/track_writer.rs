use crate::error::Result;
use crate::models::TrackPoint;
use csv::WriterBuilder;
use std::path::Path;
use tracing::info;

/// Write track points as CSV with a header row, creating parent directories
pub fn write_track(points: &[TrackPoint], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for point in points {
        writer.serialize(point)?;
    }
    writer.flush()?;

    info!("Saved {} track points to {}", points.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IntensityCategory, TrackSource};
    use crate::readers::read_saved_track;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_saved_track_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracks").join("seroja_2021_track.csv");

        let point = TrackPoint {
            iso_time: NaiveDate::from_ymd_opt(2021, 4, 5)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap(),
            lat: Some(-10.1),
            lon: Some(123.5),
            wmo_wind: Some(45.0),
            wmo_pres: None,
            name: "SEROJA".to_string(),
            season: 2021,
            basin: "SI".to_string(),
            intensity_category: IntensityCategory::TropicalStorm,
            cyclone_name: "Seroja".to_string(),
            cyclone_year: 2021,
            analysis_id: "seroja_2021".to_string(),
            data_source: TrackSource::Ibtracs,
        };

        write_track(&[point.clone()], &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("ISO_TIME,LAT,LON,WMO_WIND,WMO_PRES,NAME"));
        assert!(contents.contains("2021-04-05 06:00:00"));
        assert!(contents.contains("Tropical Storm"));

        let loaded = read_saved_track(&path).unwrap();
        assert_eq!(loaded, vec![point]);
    }
}
