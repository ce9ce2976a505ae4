use geo::{BoundingRect, Geometry, Rect};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A named group of provinces within one country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RegionPreset {
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(length(min = 1))]
    pub country: String,

    #[validate(length(min = 1))]
    pub provinces: Vec<String>,
}

impl RegionPreset {
    pub fn new(name: &str, country: &str, provinces: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            country: country.to_string(),
            provinces: provinces.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Ad-hoc region built from a country and a list of provinces
    pub fn custom(country: &str, provinces: Vec<String>) -> Self {
        Self {
            name: format!("{} Custom Region", country),
            country: country.to_string(),
            provinces,
        }
    }
}

/// An administrative unit's boundary
#[derive(Debug, Clone, PartialEq)]
pub struct RegionBoundary {
    pub name: String,
    pub country: String,
    pub geometry: Geometry<f64>,
}

impl RegionBoundary {
    pub fn new(name: &str, country: &str, geometry: Geometry<f64>) -> Self {
        Self {
            name: name.to_string(),
            country: country.to_string(),
            geometry,
        }
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }
}

/// Combined extent of a set of boundaries
pub fn total_bounds(boundaries: &[RegionBoundary]) -> Option<Rect<f64>> {
    boundaries
        .iter()
        .filter_map(|b| b.bounds())
        .reduce(|acc, rect| {
            Rect::new(
                (acc.min().x.min(rect.min().x), acc.min().y.min(rect.min().y)),
                (acc.max().x.max(rect.max().x), acc.max().y.max(rect.max().y)),
            )
        })
}

/// Built-in presets for the Indonesian island groups
pub fn default_region_presets() -> Vec<(String, RegionPreset)> {
    vec![
        (
            "indonesia_sumatra".to_string(),
            RegionPreset::new(
                "Sumatra Region",
                "Indonesia",
                &[
                    "Aceh",
                    "Sumatera Utara",
                    "Sumatera Barat",
                    "Riau",
                    "Jambi",
                    "Sumatera Selatan",
                    "Bengkulu",
                    "Lampung",
                    "Bangka-Belitung",
                    "Kepulauan Riau",
                ],
            ),
        ),
        (
            "indonesia_java".to_string(),
            RegionPreset::new(
                "Java Region",
                "Indonesia",
                &[
                    "Banten",
                    "Jakarta Raya",
                    "Jawa Barat",
                    "Jawa Tengah",
                    "Yogyakarta",
                    "Jawa Timur",
                ],
            ),
        ),
        (
            "indonesia_kalimantan".to_string(),
            RegionPreset::new(
                "Kalimantan Region",
                "Indonesia",
                &[
                    "Kalimantan Barat",
                    "Kalimantan Tengah",
                    "Kalimantan Selatan",
                    "Kalimantan Timur",
                    "Kalimantan Utara",
                ],
            ),
        ),
        (
            "indonesia_sulawesi".to_string(),
            RegionPreset::new(
                "Sulawesi Region",
                "Indonesia",
                &[
                    "Sulawesi Utara",
                    "Gorontalo",
                    "Sulawesi Tengah",
                    "Sulawesi Selatan",
                    "Sulawesi Tenggara",
                    "Sulawesi Barat",
                ],
            ),
        ),
        (
            "indonesia_bali_nusa_tenggara".to_string(),
            RegionPreset::new(
                "Bali and Nusa Tenggara Region",
                "Indonesia",
                &["Bali", "Nusa Tenggara Barat", "Nusa Tenggara Timur"],
            ),
        ),
        (
            "indonesia_maluku".to_string(),
            RegionPreset::new("Maluku Region", "Indonesia", &["Maluku", "Maluku Utara"]),
        ),
        (
            "indonesia_papua".to_string(),
            RegionPreset::new("Papua Region", "Indonesia", &["Papua", "Papua Barat"]),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_total_bounds() {
        let a = RegionBoundary::new(
            "A",
            "Testland",
            Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 0.0, y: 0.0)]),
        );
        let b = RegionBoundary::new(
            "B",
            "Testland",
            Geometry::Polygon(polygon![(x: -1.0, y: 3.0), (x: 1.0, y: 3.0), (x: 1.0, y: 5.0), (x: -1.0, y: 3.0)]),
        );

        let bounds = total_bounds(&[a, b]).unwrap();
        assert_eq!(bounds.min().x, -1.0);
        assert_eq!(bounds.min().y, 0.0);
        assert_eq!(bounds.max().x, 2.0);
        assert_eq!(bounds.max().y, 5.0);

        assert!(total_bounds(&[]).is_none());
    }

    #[test]
    fn test_presets_validate() {
        for (key, preset) in default_region_presets() {
            assert!(preset.validate().is_ok(), "preset {} invalid", key);
        }
        let custom = RegionPreset::custom("Indonesia", vec!["Aceh".to_string()]);
        assert_eq!(custom.name, "Indonesia Custom Region");
    }
}
