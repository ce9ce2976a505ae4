pub mod boundary_reader;
pub mod tile_reader;
pub mod track_reader;

pub use boundary_reader::{select_provinces, BoundaryProvider, GeoJsonBoundaryProvider};
pub use tile_reader::TileReader;
pub use track_reader::{read_saved_track, TrackReader};
