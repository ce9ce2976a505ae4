use crate::error::{ProcessingError, Result};
use crate::models::RegionBoundary;
use crate::utils::constants::{BOUNDARY_COUNTRY_PROPERTY, BOUNDARY_NAME_PROPERTY};
use geojson::{Feature, GeoJson};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Source of administrative boundaries
pub trait BoundaryProvider {
    /// First-level administrative units of a country
    fn provinces(&self, country: &str) -> Result<Vec<RegionBoundary>>;
}

/// Reads Natural Earth admin-1 style boundaries from a GeoJSON FeatureCollection
#[derive(Debug, Clone)]
pub struct GeoJsonBoundaryProvider {
    path: PathBuf,
    country_property: String,
    name_property: String,
}

impl GeoJsonBoundaryProvider {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            country_property: BOUNDARY_COUNTRY_PROPERTY.to_string(),
            name_property: BOUNDARY_NAME_PROPERTY.to_string(),
        }
    }

    pub fn with_properties(mut self, country_property: &str, name_property: &str) -> Self {
        self.country_property = country_property.to_string();
        self.name_property = name_property.to_string();
        self
    }

    /// Every feature carrying a geometry and both name properties
    pub fn read_all(&self) -> Result<Vec<RegionBoundary>> {
        if !self.path.exists() {
            return Err(ProcessingError::MissingData(format!(
                "Boundary file not found: {}",
                self.path.display()
            )));
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let collection = match GeoJson::from_str(&contents)? {
            GeoJson::FeatureCollection(collection) => collection,
            _ => {
                return Err(ProcessingError::InvalidFormat(format!(
                    "{} is not a GeoJSON FeatureCollection",
                    self.path.display()
                )))
            }
        };

        let total = collection.features.len();
        let boundaries: Vec<RegionBoundary> = collection
            .features
            .into_iter()
            .filter_map(|feature| self.to_boundary(feature).transpose())
            .collect::<Result<_>>()?;

        debug!(
            "Read {} of {} boundary features from {}",
            boundaries.len(),
            total,
            self.path.display()
        );
        Ok(boundaries)
    }

    fn to_boundary(&self, feature: Feature) -> Result<Option<RegionBoundary>> {
        let property = |key: &str| {
            feature
                .property(key)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };

        let (Some(name), Some(country)) = (
            property(&self.name_property),
            property(&self.country_property),
        ) else {
            return Ok(None);
        };

        let Some(geometry) = feature.geometry else {
            return Ok(None);
        };

        let geometry: geo::Geometry<f64> = geometry.try_into()?;
        Ok(Some(RegionBoundary::new(&name, &country, geometry)))
    }
}

impl BoundaryProvider for GeoJsonBoundaryProvider {
    fn provinces(&self, country: &str) -> Result<Vec<RegionBoundary>> {
        let provinces: Vec<RegionBoundary> = self
            .read_all()?
            .into_iter()
            .filter(|b| b.country == country)
            .collect();

        if provinces.is_empty() {
            return Err(ProcessingError::RegionNotFound(country.to_string()));
        }

        info!("Loaded {} provinces for {}", provinces.len(), country);
        Ok(provinces)
    }
}

/// Boundaries whose name is in `names`, warning about names with no match
pub fn select_provinces(boundaries: Vec<RegionBoundary>, names: &[String]) -> Vec<RegionBoundary> {
    let wanted: HashSet<&str> = names.iter().map(|n| n.as_str()).collect();
    let available: Vec<String> = boundaries.iter().map(|b| b.name.clone()).collect();

    let selected: Vec<RegionBoundary> = boundaries
        .into_iter()
        .filter(|b| wanted.contains(b.name.as_str()))
        .collect();

    let found: HashSet<&str> = selected.iter().map(|b| b.name.as_str()).collect();
    let missing: Vec<&str> = names
        .iter()
        .map(|n| n.as_str())
        .filter(|n| !found.contains(n))
        .collect();

    if !missing.is_empty() {
        let mut available = available;
        available.sort();
        warn!(
            "Provinces not found: {}. Available: {}",
            missing.join(", "),
            available.join(", ")
        );
    }

    info!("Selected {} of {} requested provinces", selected.len(), names.len());
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PROVINCES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"admin": "Indonesia", "name": "Bali"},
                "geometry": {"type": "Polygon", "coordinates": [[[114.4, -8.9], [115.7, -8.9], [115.7, -8.0], [114.4, -8.0], [114.4, -8.9]]]}
            },
            {
                "type": "Feature",
                "properties": {"admin": "Indonesia", "name": "Nusa Tenggara Barat"},
                "geometry": {"type": "Polygon", "coordinates": [[[115.8, -9.1], [119.3, -9.1], [119.3, -8.0], [115.8, -8.0], [115.8, -9.1]]]}
            },
            {
                "type": "Feature",
                "properties": {"admin": "Timor-Leste", "name": "Dili"},
                "geometry": {"type": "Polygon", "coordinates": [[[125.4, -8.7], [125.8, -8.7], [125.8, -8.4], [125.4, -8.4], [125.4, -8.7]]]}
            },
            {
                "type": "Feature",
                "properties": {"admin": "Indonesia"},
                "geometry": null
            }
        ]
    }"#;

    fn provider() -> (NamedTempFile, GeoJsonBoundaryProvider) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(PROVINCES.as_bytes()).unwrap();
        let provider = GeoJsonBoundaryProvider::new(file.path());
        (file, provider)
    }

    #[test]
    fn test_provinces_by_country() {
        let (_file, provider) = provider();
        let provinces = provider.provinces("Indonesia").unwrap();

        assert_eq!(provinces.len(), 2);
        assert!(provinces.iter().all(|p| p.country == "Indonesia"));
        assert!(provinces[0].bounds().is_some());
    }

    #[test]
    fn test_unknown_country() {
        let (_file, provider) = provider();
        assert!(matches!(
            provider.provinces("Atlantis"),
            Err(ProcessingError::RegionNotFound(_))
        ));
    }

    #[test]
    fn test_select_provinces_skips_missing_names() {
        let (_file, provider) = provider();
        let provinces = provider.provinces("Indonesia").unwrap();

        let selected = select_provinces(provinces, &["Bali".to_string(), "Papua".to_string()]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "Bali");
    }

    #[test]
    fn test_missing_file() {
        let provider = GeoJsonBoundaryProvider::new(Path::new("/nonexistent/provinces.geojson"));
        assert!(matches!(
            provider.read_all(),
            Err(ProcessingError::MissingData(_))
        ));
    }
}
