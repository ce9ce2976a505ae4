use crate::error::{ProcessingError, Result};
use geo::Rect;
use std::f64::consts::PI;

/// A tile's position on the unit square of the Web-Mercator world map.
///
/// `x` and `y` are the fractions of the map width and height at the tile's
/// north-west corner and `size` is the tile's side, `2^-level`. Working in
/// fractions keeps quadkeys of any length decodable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileXY {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub level: usize,
}

/// Decode a quadkey into its position on the world map.
///
/// Each digit selects a quadrant of its parent tile: `1` moves east,
/// `2` moves south and `3` does both.
pub fn quadkey_to_tile(quadkey: &str) -> Result<TileXY> {
    if quadkey.is_empty() {
        return Err(ProcessingError::invalid_quadkey(
            quadkey,
            "quadkey must contain at least one digit",
        ));
    }

    let mut tile = TileXY {
        x: 0.0,
        y: 0.0,
        size: 1.0,
        level: 0,
    };

    for (i, digit) in quadkey.chars().enumerate() {
        tile.size /= 2.0;
        tile.level += 1;
        match digit {
            '0' => {}
            '1' => tile.x += tile.size,
            '2' => tile.y += tile.size,
            '3' => {
                tile.x += tile.size;
                tile.y += tile.size;
            }
            other => {
                return Err(ProcessingError::invalid_quadkey(
                    quadkey,
                    format!("digit '{}' at position {} is not in 0-3", other, i),
                ))
            }
        }
    }

    Ok(tile)
}

/// Decode a quadkey to the latitude/longitude of its tile center
///
/// # Examples
/// ```
/// use connectivity_processor::utils::quadkey_to_latlon;
///
/// let (lat, lon) = quadkey_to_latlon("0").unwrap();
/// assert!((lat - 66.51326).abs() < 0.00001);
/// assert!((lon - -90.0).abs() < 1e-9);
/// ```
pub fn quadkey_to_latlon(quadkey: &str) -> Result<(f64, f64)> {
    let tile = quadkey_to_tile(quadkey)?;
    let half = tile.size / 2.0;
    Ok(map_to_latlon(tile.x + half, tile.y + half))
}

/// Geographic extent of the tile addressed by a quadkey
pub fn quadkey_to_tile_bounds(quadkey: &str) -> Result<Rect<f64>> {
    let tile = quadkey_to_tile(quadkey)?;

    let (north, west) = map_to_latlon(tile.x, tile.y);
    let (south, east) = map_to_latlon(tile.x + tile.size, tile.y + tile.size);

    Ok(Rect::new((west, south), (east, north)))
}

/// Inverse Web-Mercator projection of a position given as map fractions
fn map_to_latlon(fraction_x: f64, fraction_y: f64) -> (f64, f64) {
    let x = fraction_x - 0.5;
    let y = 0.5 - fraction_y;

    let longitude = 360.0 * x;
    let latitude = 90.0 - 360.0 * (-y * 2.0 * PI).exp().atan() / PI;

    (latitude, longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_one_quadrants() {
        let (lat, lon) = quadkey_to_latlon("0").unwrap();
        assert!((lat - 66.51326).abs() < 0.00001);
        assert!((lon - -90.0).abs() < 1e-9);

        let (lat, lon) = quadkey_to_latlon("3").unwrap();
        assert!((lat - -66.51326).abs() < 0.00001);
        assert!((lon - 90.0).abs() < 1e-9);

        let (lat, lon) = quadkey_to_latlon("1").unwrap();
        assert!((lat - 66.51326).abs() < 0.00001);
        assert!((lon - 90.0).abs() < 1e-9);

        let (lat, lon) = quadkey_to_latlon("2").unwrap();
        assert!((lat - -66.51326).abs() < 0.00001);
        assert!((lon - -90.0).abs() < 1e-9);
    }

    #[test]
    fn test_tile_bits() {
        let tile = quadkey_to_tile("213").unwrap();
        // column 3, row 5 of the 8x8 level-3 grid
        assert_eq!(
            tile,
            TileXY {
                x: 3.0 / 8.0,
                y: 5.0 / 8.0,
                size: 1.0 / 8.0,
                level: 3
            }
        );
    }

    #[test]
    fn test_invalid_digits() {
        assert!(matches!(
            quadkey_to_latlon("0124"),
            Err(ProcessingError::InvalidQuadkey { .. })
        ));
        assert!(matches!(
            quadkey_to_latlon("01a2"),
            Err(ProcessingError::InvalidQuadkey { .. })
        ));
        assert!(matches!(
            quadkey_to_latlon(""),
            Err(ProcessingError::InvalidQuadkey { .. })
        ));
    }

    #[test]
    fn test_deep_quadkeys_decode() {
        for qk in ["3".repeat(40), "1".repeat(64), "2".repeat(200)] {
            let (lat, lon) = quadkey_to_latlon(&qk).unwrap();
            assert!(lat.is_finite() && lat >= -90.0 && lat < 90.0, "latitude out of range for {}", qk);
            assert!((-180.0..=180.0).contains(&lon), "longitude out of range for {}", qk);
        }

        // a deeper key stays inside its parent tile
        let parent = quadkey_to_tile_bounds(&"3".repeat(31)).unwrap();
        let (lat, lon) = quadkey_to_latlon(&"3".repeat(40)).unwrap();
        assert!(parent.min().x <= lon && lon <= parent.max().x);
        assert!(parent.min().y <= lat && lat <= parent.max().y);
    }

    #[test]
    fn test_deterministic_and_in_range() {
        let quadkeys = [
            "3101020323112312",
            "1202102332221212",
            "0000000000000000",
            "3333333333333333",
            "132",
        ];
        for qk in quadkeys {
            let first = quadkey_to_latlon(qk).unwrap();
            let second = quadkey_to_latlon(qk).unwrap();
            assert_eq!(first.0.to_bits(), second.0.to_bits());
            assert_eq!(first.1.to_bits(), second.1.to_bits());
            assert!(first.0 > -90.0 && first.0 < 90.0, "latitude out of range for {}", qk);
            assert!((-180.0..=180.0).contains(&first.1), "longitude out of range for {}", qk);
        }
    }

    #[test]
    fn test_tile_bounds_contain_center() {
        let qk = "3101020323112312";
        let bounds = quadkey_to_tile_bounds(qk).unwrap();
        let (lat, lon) = quadkey_to_latlon(qk).unwrap();

        assert!(bounds.min().x < lon && lon < bounds.max().x);
        assert!(bounds.min().y < lat && lat < bounds.max().y);

        let root = quadkey_to_tile_bounds("0").unwrap();
        assert!((root.min().x - -180.0).abs() < 1e-9);
        assert!((root.max().x - 0.0).abs() < 1e-9);
        assert!((root.min().y - 0.0).abs() < 1e-9);
        assert!((root.max().y - 85.0511287798).abs() < 1e-6);
    }
}
