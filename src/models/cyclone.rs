use crate::error::{ProcessingError, Result};
use crate::utils::constants::DEFAULT_MAX_WIND_KTS;
use crate::utils::filename::cyclone_analysis_id;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Saffir-Simpson style intensity class from sustained wind in knots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntensityCategory {
    #[serde(rename = "Unknown")]
    Unknown,
    #[serde(rename = "Tropical Depression")]
    TropicalDepression,
    #[serde(rename = "Tropical Storm")]
    TropicalStorm,
    #[serde(rename = "Category 1")]
    Category1,
    #[serde(rename = "Category 2")]
    Category2,
    #[serde(rename = "Category 3")]
    Category3,
    #[serde(rename = "Category 4")]
    Category4,
    #[serde(rename = "Category 5")]
    Category5,
}

impl IntensityCategory {
    pub fn from_wind_kts(wind_kts: Option<f64>) -> Self {
        match wind_kts {
            None => IntensityCategory::Unknown,
            Some(w) if w.is_nan() => IntensityCategory::Unknown,
            Some(w) if w < 34.0 => IntensityCategory::TropicalDepression,
            Some(w) if w < 64.0 => IntensityCategory::TropicalStorm,
            Some(w) if w < 83.0 => IntensityCategory::Category1,
            Some(w) if w < 96.0 => IntensityCategory::Category2,
            Some(w) if w < 113.0 => IntensityCategory::Category3,
            Some(w) if w < 137.0 => IntensityCategory::Category4,
            Some(_) => IntensityCategory::Category5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IntensityCategory::Unknown => "Unknown",
            IntensityCategory::TropicalDepression => "Tropical Depression",
            IntensityCategory::TropicalStorm => "Tropical Storm",
            IntensityCategory::Category1 => "Category 1",
            IntensityCategory::Category2 => "Category 2",
            IntensityCategory::Category3 => "Category 3",
            IntensityCategory::Category4 => "Category 4",
            IntensityCategory::Category5 => "Category 5",
        }
    }
}

impl fmt::Display for IntensityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Where a track point came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSource {
    Ibtracs,
    Synthetic,
}

/// The storm a track is extracted for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CycloneSpec {
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(range(min = 1980, max = 2100))]
    pub year: i32,

    pub basin: String,

    pub formation_date: NaiveDate,
    pub peak_date: NaiveDate,
    pub dissipation_date: NaiveDate,

    #[serde(default = "default_max_wind")]
    #[validate(range(min = 0.0, max = 250.0))]
    pub max_wind_kts: f64,
}

fn default_max_wind() -> f64 {
    DEFAULT_MAX_WIND_KTS
}

impl CycloneSpec {
    pub fn analysis_id(&self) -> String {
        cyclone_analysis_id(&self.name, self.year)
    }

    /// Field validation plus formation <= peak <= dissipation
    pub fn validate_all(&self) -> Result<()> {
        self.validate()?;
        if self.formation_date > self.dissipation_date {
            return Err(ProcessingError::Config(format!(
                "Cyclone {} forms on {} after it dissipates on {}",
                self.name, self.formation_date, self.dissipation_date
            )));
        }
        if self.peak_date < self.formation_date || self.peak_date > self.dissipation_date {
            return Err(ProcessingError::Config(format!(
                "Cyclone {} peak date {} lies outside {} - {}",
                self.name, self.peak_date, self.formation_date, self.dissipation_date
            )));
        }
        Ok(())
    }
}

/// One fix of a storm track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    #[serde(rename = "ISO_TIME", with = "iso_time_format")]
    pub iso_time: NaiveDateTime,
    #[serde(rename = "LAT")]
    pub lat: Option<f64>,
    #[serde(rename = "LON")]
    pub lon: Option<f64>,
    #[serde(rename = "WMO_WIND")]
    pub wmo_wind: Option<f64>,
    #[serde(rename = "WMO_PRES")]
    pub wmo_pres: Option<f64>,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "SEASON")]
    pub season: i32,
    #[serde(rename = "BASIN")]
    pub basin: String,
    pub intensity_category: IntensityCategory,
    pub cyclone_name: String,
    pub cyclone_year: i32,
    pub analysis_id: String,
    pub data_source: TrackSource,
}

/// IBTrACS timestamps: "YYYY-MM-DD HH:MM:SS"
pub mod iso_time_format {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(s.trim(), FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_thresholds() {
        assert_eq!(IntensityCategory::from_wind_kts(None), IntensityCategory::Unknown);
        assert_eq!(
            IntensityCategory::from_wind_kts(Some(33.9)),
            IntensityCategory::TropicalDepression
        );
        assert_eq!(
            IntensityCategory::from_wind_kts(Some(34.0)),
            IntensityCategory::TropicalStorm
        );
        assert_eq!(IntensityCategory::from_wind_kts(Some(64.0)), IntensityCategory::Category1);
        assert_eq!(IntensityCategory::from_wind_kts(Some(83.0)), IntensityCategory::Category2);
        assert_eq!(IntensityCategory::from_wind_kts(Some(96.0)), IntensityCategory::Category3);
        assert_eq!(IntensityCategory::from_wind_kts(Some(113.0)), IntensityCategory::Category4);
        assert_eq!(IntensityCategory::from_wind_kts(Some(137.0)), IntensityCategory::Category5);
        assert_eq!(IntensityCategory::Category3.to_string(), "Category 3");
    }

    #[test]
    fn test_cyclone_spec_dates() {
        let mut spec = CycloneSpec {
            name: "Seroja".to_string(),
            year: 2021,
            basin: "SI".to_string(),
            formation_date: NaiveDate::from_ymd_opt(2021, 4, 3).unwrap(),
            peak_date: NaiveDate::from_ymd_opt(2021, 4, 10).unwrap(),
            dissipation_date: NaiveDate::from_ymd_opt(2021, 4, 12).unwrap(),
            max_wind_kts: 75.0,
        };
        assert!(spec.validate_all().is_ok());
        assert_eq!(spec.analysis_id(), "seroja_2021");

        spec.peak_date = NaiveDate::from_ymd_opt(2021, 4, 20).unwrap();
        assert!(spec.validate_all().is_err());
    }
}
