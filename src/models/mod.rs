pub mod bin;
pub mod comparison;
pub mod cyclone;
pub mod period;
pub mod region;
pub mod tile;

pub use bin::{AggregatedBin, AggregatedDataset, StatSummary};
pub use comparison::{ComparisonDataset, ComparisonRecord};
pub use cyclone::{CycloneSpec, IntensityCategory, TrackPoint, TrackSource};
pub use period::Period;
pub use region::{default_region_presets, total_bounds, RegionBoundary, RegionPreset};
pub use tile::{DataType, RawTile, RawTileTable, TileColumns, TileDataset, TileRecord};
