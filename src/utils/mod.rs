pub mod constants;
pub mod filename;
pub mod progress;
pub mod quadkey;

pub use constants::*;
pub use filename::{combined_output_name, region_slug, today};
pub use progress::ProgressReporter;
pub use quadkey::{quadkey_to_latlon, quadkey_to_tile, quadkey_to_tile_bounds, TileXY};
