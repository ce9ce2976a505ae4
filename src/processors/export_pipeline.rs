use crate::error::{ProcessingError, Result};
use crate::models::{AggregatedDataset, DataType, TileDataset};
use crate::processors::{compare_to_baseline, Aggregator, DatasetSummary};
use crate::readers::TileReader;
use crate::settings::Settings;
use crate::utils::filename::{combined_output_name, today};
use crate::utils::ProgressReporter;
use crate::writers::{bins_to_batch, comparison_to_batch, ParquetWriter, SheetWriter};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How several input files are turned into outputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportMode {
    /// One output set per input file
    #[default]
    Individual,
    /// All inputs concatenated into one output set
    Combined,
}

/// Output label to the files written for it
pub type ExportOutputs = BTreeMap<String, Vec<PathBuf>>;

/// Aggregates processed tile files and writes them as sheets and Parquet
pub struct ExportPipeline {
    ookla_dir: PathBuf,
    output_dir: PathBuf,
    sheet_writer: SheetWriter,
    parquet_writer: ParquetWriter,
    aggregator: Aggregator,
    reader: TileReader,
    date: NaiveDate,
    silent: bool,
}

impl ExportPipeline {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            ookla_dir: settings.paths.ookla_dir.clone(),
            output_dir: settings.paths.output_dir.clone(),
            sheet_writer: SheetWriter::new().with_row_limit(settings.export.row_limit)?,
            parquet_writer: ParquetWriter::new()
                .with_compression(&settings.export.compression)?
                .with_row_group_size(settings.export.row_group_size),
            aggregator: Aggregator::new(),
            reader: TileReader::new(),
            date: today(),
            silent: false,
        })
    }

    pub fn with_output_dir(mut self, output_dir: &Path) -> Self {
        self.output_dir = output_dir.to_path_buf();
        self
    }

    pub fn with_row_limit(mut self, row_limit: usize) -> Result<Self> {
        self.sheet_writer = self.sheet_writer.with_row_limit(row_limit)?;
        Ok(self)
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.parquet_writer = self.parquet_writer.with_compression(compression)?;
        Ok(self)
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.aggregator = self.aggregator.with_max_workers(max_workers);
        self
    }

    /// Stamp used in combined output names instead of today's date
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Existing input paths; relative names not found as given are looked
    /// up in the Ookla data directory, anything else is skipped
    pub fn resolve_inputs(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let resolved: Vec<PathBuf> = inputs
            .iter()
            .filter_map(|input| {
                let candidate = if input.exists() {
                    input.clone()
                } else {
                    self.ookla_dir.join(input)
                };
                if candidate.exists() {
                    Some(candidate)
                } else {
                    warn!("File not found: {}", candidate.display());
                    None
                }
            })
            .collect();

        if resolved.is_empty() {
            return Err(ProcessingError::MissingData(
                "No valid data files found".to_string(),
            ));
        }
        Ok(resolved)
    }

    pub async fn prepare(&self, inputs: &[PathBuf], mode: ExportMode) -> Result<ExportOutputs> {
        let inputs = self.resolve_inputs(inputs)?;
        std::fs::create_dir_all(&self.output_dir)?;

        let outputs = match mode {
            ExportMode::Individual => {
                info!("Preparing {} file(s) individually", inputs.len());
                let mut outputs = ExportOutputs::new();
                for path in &inputs {
                    outputs.extend(self.prepare_single(path)?);
                }
                outputs
            }
            ExportMode::Combined => {
                info!("Preparing {} file(s) as one combined export", inputs.len());
                self.prepare_combined(inputs).await?
            }
        };

        info!(
            "Created {} output set(s) in {}",
            outputs.len(),
            self.output_dir.display()
        );
        Ok(outputs)
    }

    fn prepare_single(&self, path: &Path) -> Result<ExportOutputs> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ProcessingError::InvalidFormat(format!("Invalid input path: {}", path.display()))
            })?;

        let progress = ProgressReporter::new_spinner(&format!("Processing {}", stem), self.silent);
        let dataset = self.reader.read_tiles(path)?;
        info!("{}: {} records", stem, dataset.len());

        let aggregated = self.aggregator.aggregate(&dataset)?;
        let batch = bins_to_batch(&aggregated)?;

        let base = self.output_dir.join(&stem);
        let mut files = self.sheet_writer.write(&batch, &base, "Data")?;

        let parquet_path = self.output_dir.join(format!("{}.parquet", stem));
        self.parquet_writer.write_batch(&batch, &parquet_path)?;
        files.push(parquet_path);

        progress.finish_with_message(&format!("Created {} ({} bins)", stem, aggregated.len()));
        Ok(BTreeMap::from([(stem, files)]))
    }

    async fn prepare_combined(&self, inputs: Vec<PathBuf>) -> Result<ExportOutputs> {
        let progress = ProgressReporter::new_spinner("Reading input files", self.silent);
        let combined = TileDataset::concat(self.reader.read_many(inputs).await?);
        info!("Combined {} total records", combined.len());

        progress.set_message("Aggregating");
        let aggregated = self.aggregator.aggregate(&combined)?;
        let name = combined_output_name(combined.region_name(), self.date);

        progress.set_message("Writing outputs");
        let outputs = self.export_aggregated(&aggregated, &name)?;
        progress.finish_with_message(&format!("Created {} output set(s)", outputs.len()));

        println!("{}", DatasetSummary::new(&combined, &aggregated).render());
        Ok(outputs)
    }

    /// The combined set, one set per service type with rows, and a baseline
    /// comparison when more than one period is present
    fn export_aggregated(&self, aggregated: &AggregatedDataset, name: &str) -> Result<ExportOutputs> {
        let mut outputs = ExportOutputs::new();

        let batch = bins_to_batch(aggregated)?;
        let mut combined = self
            .sheet_writer
            .write(&batch, &self.output_dir.join(format!("{}_combined", name)), "All Data")?;
        let parquet_path = self.output_dir.join(format!("{}_combined.parquet", name));
        self.parquet_writer.write_batch(&batch, &parquet_path)?;
        combined.push(parquet_path);
        outputs.insert("combined".to_string(), combined);

        for data_type in DataType::all() {
            let subset = aggregated.filter_data_type(data_type);
            if subset.is_empty() {
                continue;
            }
            let base = self.output_dir.join(format!("{}_{}", name, data_type));
            let files = self
                .sheet_writer
                .write(&bins_to_batch(&subset)?, &base, data_type.sheet_name())?;
            outputs.insert(data_type.to_string(), files);
        }

        let periods = aggregated.periods();
        if periods.len() > 1 {
            info!("{} periods present, writing baseline comparison", periods.len());
            let comparison = compare_to_baseline(aggregated)?;
            let base = self.output_dir.join(format!("{}_comparison", name));
            let files = self
                .sheet_writer
                .write(&comparison_to_batch(&comparison)?, &base, "Comparison")?;
            outputs.insert("comparison".to_string(), files);
        }

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TileRecord;
    use crate::writers::tiles_to_batch;
    use tempfile::TempDir;

    fn write_tiles(path: &Path, records: Vec<TileRecord>) {
        let mut records = records;
        records.iter_mut().for_each(|r| r.derive_mbps());
        let dataset = TileDataset::from_records(records);
        ParquetWriter::new()
            .write_batch(&tiles_to_batch(&dataset).unwrap(), path)
            .unwrap();
    }

    fn pipeline(dir: &TempDir) -> ExportPipeline {
        let mut settings = Settings::default();
        settings.paths.ookla_dir = dir.path().join("ookla");
        settings.paths.output_dir = dir.path().join("output");
        ExportPipeline::new(&settings)
            .unwrap()
            .with_date(NaiveDate::from_ymd_opt(2025, 1, 9).unwrap())
            .with_max_workers(2)
            .with_silent(true)
    }

    fn bali(quadkey: &str, year: i32, quarter: u8, data_type: DataType, kbps: f64) -> TileRecord {
        TileRecord::new(quadkey, year, quarter, data_type)
            .with_speeds(kbps, kbps / 4.0)
            .with_counts(2, 1)
            .with_region("Bali", "Bali Region", "Indonesia")
    }

    #[tokio::test]
    async fn test_individual_mode() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir);
        std::fs::create_dir_all(dir.path().join("ookla")).unwrap();
        write_tiles(
            &dir.path().join("ookla").join("bali_2024_Q1_mobile.parquet"),
            vec![bali("1320", 2024, 1, DataType::Mobile, 10_000.0)],
        );

        // bare file name resolved against the ookla directory
        let outputs = pipeline
            .prepare(&[PathBuf::from("bali_2024_Q1_mobile.parquet")], ExportMode::Individual)
            .await
            .unwrap();

        let files = &outputs["bali_2024_Q1_mobile"];
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("bali_2024_Q1_mobile_Data.csv"));
        assert!(files[1].ends_with("bali_2024_Q1_mobile.parquet"));
        assert!(files.iter().all(|f| f.exists()));
    }

    #[tokio::test]
    async fn test_combined_mode_outputs() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir);

        let q1 = dir.path().join("q1.parquet");
        let q2 = dir.path().join("q2.parquet");
        write_tiles(
            &q1,
            vec![
                bali("1320", 2024, 1, DataType::Mobile, 10_000.0),
                bali("1320", 2024, 1, DataType::Fixed, 30_000.0),
            ],
        );
        write_tiles(&q2, vec![bali("1320", 2024, 2, DataType::Mobile, 15_000.0)]);

        let outputs = pipeline
            .prepare(&[q1, q2], ExportMode::Combined)
            .await
            .unwrap();

        let labels: Vec<_> = outputs.keys().cloned().collect();
        assert_eq!(labels, vec!["combined", "comparison", "fixed", "mobile"]);

        let comparison = &outputs["comparison"][0];
        assert!(comparison.ends_with("bali_region_tableau_20250109_comparison_Comparison.csv"));
        let contents = std::fs::read_to_string(comparison).unwrap();
        assert!(contents.lines().next().unwrap().contains("d_kbps_pct_change"));
        assert_eq!(contents.lines().count(), 4);

        let mobile = std::fs::read_to_string(&outputs["mobile"][0]).unwrap();
        assert_eq!(mobile.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_single_period_has_no_comparison() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir);

        let path = dir.path().join("q1.parquet");
        write_tiles(&path, vec![bali("1320", 2024, 1, DataType::Mobile, 10_000.0)]);

        let outputs = pipeline.prepare(&[path], ExportMode::Combined).await.unwrap();
        assert!(!outputs.contains_key("comparison"));
        assert!(!outputs.contains_key("fixed"));
        assert!(outputs.contains_key("mobile"));
    }

    #[tokio::test]
    async fn test_no_valid_inputs() {
        let dir = TempDir::new().unwrap();
        let result = pipeline(&dir)
            .prepare(&[PathBuf::from("missing.parquet")], ExportMode::Individual)
            .await;
        assert!(matches!(result, Err(ProcessingError::MissingData(_))));
    }

    #[test]
    fn test_invalid_compression() {
        let dir = TempDir::new().unwrap();
        assert!(pipeline(&dir).with_compression("brotli9").is_err());
    }
}
