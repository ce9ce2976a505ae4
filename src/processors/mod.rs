pub mod aggregator;
pub mod comparison;
pub mod export_pipeline;
pub mod region_filter;
pub mod summary;
pub mod track_extractor;

pub use aggregator::Aggregator;
pub use comparison::{compare_to_baseline, percent_change};
pub use export_pipeline::{ExportMode, ExportOutputs, ExportPipeline};
pub use region_filter::RegionFilter;
pub use summary::DatasetSummary;
pub use track_extractor::{synthetic_track, track_summary, TrackExtractor};
