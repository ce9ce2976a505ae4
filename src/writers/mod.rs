pub mod batches;
pub mod parquet_writer;
pub mod sheet_writer;
pub mod track_writer;

pub use batches::{bins_to_batch, comparison_to_batch, tiles_to_batch};
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};
pub use sheet_writer::SheetWriter;
pub use track_writer::write_track;
