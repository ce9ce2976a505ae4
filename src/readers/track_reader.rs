use crate::error::{ProcessingError, Result};
use crate::models::{CycloneSpec, IntensityCategory, TrackPoint, TrackSource};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::models::cyclone::iso_time_format::FORMAT as ISO_TIME_FORMAT;

/// The IBTrACS columns a track needs; everything is read as text and parsed leniently
#[derive(Debug, Deserialize)]
struct IbtracsRow {
    #[serde(rename = "SEASON")]
    season: String,
    #[serde(rename = "BASIN")]
    basin: String,
    #[serde(rename = "NAME")]
    name: String,
    #[serde(rename = "ISO_TIME")]
    iso_time: String,
    #[serde(rename = "LAT")]
    lat: String,
    #[serde(rename = "LON")]
    lon: String,
    #[serde(rename = "WMO_WIND")]
    wmo_wind: String,
    #[serde(rename = "WMO_PRES")]
    wmo_pres: String,
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Reads storm tracks from an IBTrACS "list" CSV archive
pub struct TrackReader {
    path: PathBuf,
}

impl TrackReader {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All fixes of the named storm, sorted by time.
    ///
    /// Late-season storms are filed under the following season, so both
    /// `year` and `year + 1` match. The units row under the header is skipped.
    pub fn read_track(&self, cyclone: &CycloneSpec) -> Result<Vec<TrackPoint>> {
        let file = File::open(&self.path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let wanted_name = cyclone.name.to_uppercase();
        let analysis_id = cyclone.analysis_id();
        let mut points = Vec::new();
        let mut skipped = 0usize;

        for row in reader.deserialize::<IbtracsRow>().skip(1) {
            let row = row?;

            if row.name.trim().to_uppercase() != wanted_name {
                continue;
            }
            let Ok(season) = row.season.trim().parse::<i32>() else {
                skipped += 1;
                continue;
            };
            if season != cyclone.year && season != cyclone.year + 1 {
                continue;
            }
            let Ok(iso_time) = NaiveDateTime::parse_from_str(row.iso_time.trim(), ISO_TIME_FORMAT)
            else {
                skipped += 1;
                continue;
            };

            let wmo_wind = parse_number(&row.wmo_wind);
            points.push(TrackPoint {
                iso_time,
                lat: parse_number(&row.lat),
                lon: parse_number(&row.lon),
                wmo_wind,
                wmo_pres: parse_number(&row.wmo_pres),
                name: row.name.trim().to_string(),
                season,
                basin: row.basin.trim().to_string(),
                intensity_category: IntensityCategory::from_wind_kts(wmo_wind),
                cyclone_name: cyclone.name.clone(),
                cyclone_year: cyclone.year,
                analysis_id: analysis_id.clone(),
                data_source: TrackSource::Ibtracs,
            });
        }

        if skipped > 0 {
            warn!("Skipped {} {} rows with unreadable season or time", skipped, cyclone.name);
        }

        points.sort_by_key(|p| p.iso_time);
        info!(
            "Found {} track points for {} {} in {}",
            points.len(),
            cyclone.name,
            cyclone.year,
            self.path.display()
        );
        Ok(points)
    }
}

/// Load a track previously saved by the extractor
pub fn read_saved_track(path: &Path) -> Result<Vec<TrackPoint>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let points = reader
        .deserialize::<TrackPoint>()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if points.is_empty() {
        return Err(ProcessingError::MissingData(format!(
            "Track file {} has no points",
            path.display()
        )));
    }

    debug!("Loaded {} track points from {}", points.len(), path.display());
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ARCHIVE: &str = "\
SID,SEASON,NUMBER,BASIN,SUBBASIN,NAME,ISO_TIME,NATURE,LAT,LON,WMO_WIND,WMO_PRES
 ,Year, , , , ,,,degrees_north,degrees_east,kts,mb
2021093S13124,2021,20,SI,WA,SEROJA,2021-04-05 06:00:00,TS,-10.1,123.5,45,990
2021093S13124,2021,20,SI,WA,SEROJA,2021-04-05 00:00:00,TS,-9.8,123.9, ,995
2021093S13124,2021,20,SI,WA,SEROJA,2021-04-10 12:00:00,TS,-20.0,115.0,65,975
2015120S10100,2015,11,SI,WA,SEROJA,2015-04-30 00:00:00,TS,-12.0,110.0,40,998
2021050S15100,2021,12,SI,WA,OTHER,2021-02-19 00:00:00,TS,-15.0,100.0,30,1000
";

    fn seroja() -> CycloneSpec {
        CycloneSpec {
            name: "Seroja".to_string(),
            year: 2021,
            basin: "SI".to_string(),
            formation_date: NaiveDate::from_ymd_opt(2021, 4, 3).unwrap(),
            peak_date: NaiveDate::from_ymd_opt(2021, 4, 10).unwrap(),
            dissipation_date: NaiveDate::from_ymd_opt(2021, 4, 12).unwrap(),
            max_wind_kts: 75.0,
        }
    }

    #[test]
    fn test_read_track_filters_and_sorts() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ARCHIVE.as_bytes()).unwrap();

        let points = TrackReader::new(file.path()).read_track(&seroja()).unwrap();
        assert_eq!(points.len(), 3);
        assert!(points.windows(2).all(|w| w[0].iso_time <= w[1].iso_time));

        let first = &points[0];
        assert_eq!(first.wmo_wind, None);
        assert_eq!(first.intensity_category, IntensityCategory::Unknown);
        assert_eq!(first.data_source, TrackSource::Ibtracs);
        assert_eq!(first.analysis_id, "seroja_2021");
        assert_eq!(points[2].intensity_category, IntensityCategory::Category1);
    }

    #[test]
    fn test_next_season_matches() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ARCHIVE.as_bytes()).unwrap();

        let mut spec = seroja();
        spec.year = 2020;
        let points = TrackReader::new(file.path()).read_track(&spec).unwrap();
        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|p| p.season == 2021));
    }
}
