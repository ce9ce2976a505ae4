use crate::error::{ProcessingError, Result};
use crate::models::{
    total_bounds, DataType, Period, RawTile, RawTileTable, RegionBoundary, RegionPreset,
    TileDataset, TileRecord,
};
use crate::utils::quadkey::quadkey_to_tile_bounds;
use geo::{BoundingRect, Geometry, Intersects, Rect};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use wkt::TryFromWkt;

/// Restricts upstream tiles to the provinces of a region with a spatial join
pub struct RegionFilter {
    boundaries: Vec<(RegionBoundary, Rect<f64>)>,
    extent: Rect<f64>,
    region_name: String,
    country: String,
    max_workers: usize,
}

impl RegionFilter {
    pub fn new(boundaries: Vec<RegionBoundary>, region: &RegionPreset) -> Result<Self> {
        let extent = total_bounds(&boundaries).ok_or(ProcessingError::NoBoundaries)?;
        let boundaries = boundaries
            .into_iter()
            .filter_map(|b| b.bounds().map(|rect| (b, rect)))
            .collect();

        Ok(Self {
            boundaries,
            extent,
            region_name: region.name.clone(),
            country: region.country.clone(),
            max_workers: num_cpus::get(),
        })
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Combined bounding box of the region's provinces
    pub fn extent(&self) -> Rect<f64> {
        self.extent
    }

    /// Tiles intersecting the region, one row per intersected province,
    /// annotated with period, service type, region and Mbps speeds
    pub fn filter(&self, raw: &RawTileTable, period: Period, data_type: DataType) -> Result<TileDataset> {
        info!(
            "Filtering {} tiles to {} ({} provinces)",
            raw.tiles.len(),
            self.region_name,
            self.boundaries.len()
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let extent = Geometry::Polygon(self.extent.to_polygon());

        let candidates: Vec<(&RawTile, Geometry<f64>)> = pool.install(|| {
            raw.tiles
                .par_iter()
                .map(|tile| tile_geometry(tile).map(|geometry| (tile, geometry)))
                .filter(|result| match result {
                    Ok((_, geometry)) => geometry.intersects(&extent),
                    Err(_) => true,
                })
                .collect::<Result<Vec<_>>>()
        })?;
        info!("{} tiles within region bounding box", candidates.len());

        let records: Vec<TileRecord> = pool.install(|| {
            candidates
                .par_iter()
                .flat_map_iter(|(tile, geometry)| {
                    self.matching_provinces(geometry)
                        .map(move |boundary| self.annotate(tile, boundary, period, data_type))
                })
                .collect()
        });

        if records.is_empty() {
            warn!(
                "No tiles intersect {} for {} {}",
                self.region_name, period, data_type
            );
        } else {
            info!("{} tile rows after province join", records.len());
        }

        Ok(TileDataset::new(raw.columns.with_region_metadata(), records))
    }

    fn matching_provinces<'a>(
        &'a self,
        geometry: &'a Geometry<f64>,
    ) -> impl Iterator<Item = &'a RegionBoundary> + 'a {
        let tile_rect = geometry.bounding_rect();
        self.boundaries
            .iter()
            .filter(move |(_, rect)| tile_rect.map(|t| t.intersects(rect)).unwrap_or(false))
            .filter(move |(boundary, _)| geometry.intersects(&boundary.geometry))
            .map(|(boundary, _)| boundary)
    }

    fn annotate(
        &self,
        tile: &RawTile,
        boundary: &RegionBoundary,
        period: Period,
        data_type: DataType,
    ) -> TileRecord {
        let mut record = TileRecord::new(tile.quadkey.clone(), period.year, period.quarter, data_type);
        record.avg_d_kbps = tile.avg_d_kbps;
        record.avg_u_kbps = tile.avg_u_kbps;
        record.avg_lat_ms = tile.avg_lat_ms;
        record.tests = tile.tests;
        record.devices = tile.devices;
        record.name = Some(boundary.name.clone());
        record.region = Some(self.region_name.clone());
        record.country = Some(self.country.clone());
        record.derive_mbps();
        record
    }
}

/// Tile footprint from its WKT polygon, or from its quadkey when there is none
fn tile_geometry(tile: &RawTile) -> Result<Geometry<f64>> {
    match &tile.tile_wkt {
        Some(wkt) => Geometry::try_from_wkt_str(wkt).map_err(|e| {
            ProcessingError::InvalidFormat(format!(
                "Tile {} has unreadable geometry: {}",
                tile.quadkey, e
            ))
        }),
        None => {
            debug!("Tile {} has no WKT, using quadkey bounds", tile.quadkey);
            Ok(Geometry::Polygon(quadkey_to_tile_bounds(&tile.quadkey)?.to_polygon()))
        }
    }
}
