use crate::error::{ProcessingError, Result};
use crate::models::{CycloneSpec, IntensityCategory, TrackPoint, TrackSource};
use crate::readers::{read_saved_track, TrackReader};
use crate::utils::constants::{IBTRACS_FILE, IBTRACS_URL, TRACK_INTERVAL_HOURS};
use crate::utils::filename::track_filename;
use crate::writers::write_track;
use chrono::Duration;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Produces the track of one cyclone, from a cached file, the IBTrACS
/// archive, or a synthetic path built from the storm's dates
pub struct TrackExtractor {
    cyclone: CycloneSpec,
    archive_dir: PathBuf,
    output_dir: PathBuf,
}

impl TrackExtractor {
    pub fn new(cyclone: CycloneSpec, archive_dir: &Path, output_dir: &Path) -> Result<Self> {
        cyclone.validate_all()?;
        Ok(Self {
            cyclone,
            archive_dir: archive_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn archive_path(&self) -> PathBuf {
        self.archive_dir.join(IBTRACS_FILE)
    }

    pub fn track_path(&self, synthetic: bool) -> PathBuf {
        self.output_dir
            .join(track_filename(&self.cyclone.analysis_id(), synthetic))
    }

    /// Previously saved track if there is one, otherwise a fresh extraction
    pub fn get_track(&self) -> Result<Vec<TrackPoint>> {
        for synthetic in [false, true] {
            let path = self.track_path(synthetic);
            if path.exists() {
                info!("Loading existing track: {}", path.display());
                return read_saved_track(&path);
            }
        }
        self.extract_track()
    }

    /// Read the storm from the archive and save it, falling back to a
    /// synthetic track when the archive or the storm is unavailable
    pub fn extract_track(&self) -> Result<Vec<TrackPoint>> {
        let archive = self.archive_path();
        if !archive.exists() {
            warn!("IBTrACS archive not found: {}", archive.display());
            warn!("Download it manually from {}", IBTRACS_URL);
            return self.create_synthetic_track();
        }

        let points = match TrackReader::new(&archive).read_track(&self.cyclone) {
            Ok(points) => points,
            Err(e) => {
                warn!("Could not read {}: {}", archive.display(), e);
                warn!("Download a fresh copy from {}", IBTRACS_URL);
                return self.create_synthetic_track();
            }
        };

        if points.is_empty() {
            warn!(
                "{} {} not found in IBTrACS, it may be too recent for the archive",
                self.cyclone.name, self.cyclone.year
            );
            return self.create_synthetic_track();
        }

        write_track(&points, &self.track_path(false))?;
        println!("{}", track_summary(&points));
        Ok(points)
    }

    fn create_synthetic_track(&self) -> Result<Vec<TrackPoint>> {
        info!("Creating synthetic track for {} from configured dates", self.cyclone.name);
        let points = synthetic_track(&self.cyclone)?;
        write_track(&points, &self.track_path(true))?;
        warn!("Synthetic positions are approximate; replace with observed data when available");
        println!("{}", track_summary(&points));
        Ok(points)
    }
}

/// Six-hourly placeholder track from formation up to dissipation.
///
/// Position drifts south-east linearly; wind ramps from 25 kt to the maximum
/// before the peak date and back down afterwards; pressure is `1010 - wind / 2`.
pub fn synthetic_track(cyclone: &CycloneSpec) -> Result<Vec<TrackPoint>> {
    let start = cyclone.formation_date.and_time(chrono::NaiveTime::MIN);
    let end = cyclone.dissipation_date.and_time(chrono::NaiveTime::MIN);
    let peak = cyclone.peak_date.and_time(chrono::NaiveTime::MIN);

    let times: Vec<_> = std::iter::successors(Some(start), |t| {
        Some(*t + Duration::hours(TRACK_INTERVAL_HOURS))
    })
    .take_while(|t| *t < end)
    .collect();

    if times.is_empty() {
        return Err(ProcessingError::MissingData(format!(
            "{} forms and dissipates on the same day, no synthetic track points",
            cyclone.name
        )));
    }

    let n = times.len() as f64;
    let half = n / 2.0;
    let max_wind = cyclone.max_wind_kts;
    let analysis_id = cyclone.analysis_id();

    let points = times
        .into_iter()
        .enumerate()
        .map(|(i, iso_time)| {
            let i = i as f64;
            let progress = i / n;
            let wind = if iso_time < peak {
                25.0 + (max_wind - 25.0) * (i / half)
            } else {
                max_wind - (max_wind - 25.0) * ((i - half) / half)
            };

            TrackPoint {
                iso_time,
                lat: Some(-10.0 - progress * 2.0),
                lon: Some(100.0 + progress * 5.0),
                wmo_wind: Some(wind),
                wmo_pres: Some(1010.0 - wind / 2.0),
                name: cyclone.name.clone(),
                season: cyclone.year,
                basin: cyclone.basin.clone(),
                intensity_category: IntensityCategory::from_wind_kts(Some(wind)),
                cyclone_name: cyclone.name.clone(),
                cyclone_year: cyclone.year,
                analysis_id: analysis_id.clone(),
                data_source: TrackSource::Synthetic,
            }
        })
        .collect();

    Ok(points)
}

/// Duration, peak wind, minimum pressure and intensity distribution
pub fn track_summary(points: &[TrackPoint]) -> String {
    let mut summary = String::new();
    summary.push_str("Track Summary:\n");

    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        summary.push_str(&format!(
            "- Duration: {} to {}\n",
            first.iso_time, last.iso_time
        ));
    }
    summary.push_str(&format!("- Points: {}\n", points.len()));

    let peak_wind = points.iter().filter_map(|p| p.wmo_wind).fold(None, |acc: Option<f64>, w| {
        Some(acc.map_or(w, |a| a.max(w)))
    });
    if let Some(wind) = peak_wind {
        summary.push_str(&format!("- Peak wind: {:.0} knots\n", wind));
    }

    let min_pressure = points.iter().filter_map(|p| p.wmo_pres).fold(None, |acc: Option<f64>, p| {
        Some(acc.map_or(p, |a| a.min(p)))
    });
    if let Some(pressure) = min_pressure {
        summary.push_str(&format!("- Min pressure: {:.0} mb\n", pressure));
    }

    let mut categories: BTreeMap<IntensityCategory, usize> = BTreeMap::new();
    for point in points {
        *categories.entry(point.intensity_category).or_insert(0) += 1;
    }
    summary.push_str("- Intensity distribution:\n");
    for (category, count) in categories {
        summary.push_str(&format!("  - {}: {} points\n", category, count));
    }

    summary
}
