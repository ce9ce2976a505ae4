use crate::error::{ProcessingError, Result};
use crate::utils::constants::{DEFAULT_ROW_LIMIT, SHEET_ROW_CAP};
use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes a table as spreadsheet-ready CSV sheets, splitting on a row limit
pub struct SheetWriter {
    row_limit: usize,
}

impl SheetWriter {
    pub fn new() -> Self {
        Self {
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }

    pub fn with_row_limit(mut self, row_limit: usize) -> Result<Self> {
        if row_limit == 0 || row_limit > SHEET_ROW_CAP {
            return Err(ProcessingError::Config(format!(
                "Row limit must be between 1 and {}, got {}",
                SHEET_ROW_CAP, row_limit
            )));
        }
        self.row_limit = row_limit;
        Ok(self)
    }

    pub fn row_limit(&self) -> usize {
        self.row_limit
    }

    /// Number of sheets `rows` rows are split into; an empty table still gets one
    pub fn sheet_count(&self, rows: usize) -> usize {
        rows.div_ceil(self.row_limit).max(1)
    }

    /// Write `batch` as `<stem>_<sheet>.csv`, or `<stem>_<sheet>_1.csv`,
    /// `<stem>_<sheet>_2.csv`, ... when it exceeds the row limit.
    ///
    /// `base` is the output path without extension; its file name is the stem.
    pub fn write(&self, batch: &RecordBatch, base: &Path, sheet_name: &str) -> Result<Vec<PathBuf>> {
        let stem = base
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ProcessingError::Config(format!("Invalid output path: {}", base.display()))
            })?;
        let dir = base.parent().unwrap_or_else(|| Path::new(""));
        let sheet = sheet_name.trim().replace(' ', "_");

        let num_sheets = self.sheet_count(batch.num_rows());
        let mut paths = Vec::with_capacity(num_sheets);

        for index in 0..num_sheets {
            let start = index * self.row_limit;
            let length = self.row_limit.min(batch.num_rows() - start);
            let chunk = batch.slice(start, length);

            let chunk_sheet = if num_sheets > 1 {
                format!("{}_{}", sheet, index + 1)
            } else {
                sheet.clone()
            };
            let path = dir.join(format!("{}_{}.csv", stem, chunk_sheet));

            let file = File::create(&path)?;
            let mut writer = WriterBuilder::new().with_header(true).build(file);
            writer.write(&chunk)?;

            info!("Sheet '{}': {} rows", chunk_sheet, chunk.num_rows());
            paths.push(path);
        }

        Ok(paths)
    }
}

impl Default for SheetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int32Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn batch(rows: i32) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("value", DataType::Int32, false)]));
        RecordBatch::try_new(schema, vec![Arc::new(Int32Array::from_iter_values(0..rows))]).unwrap()
    }

    fn data_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .skip(1)
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn test_single_sheet() {
        let dir = TempDir::new().unwrap();
        let writer = SheetWriter::new();

        let paths = writer.write(&batch(5), &dir.path().join("tiles"), "All Data").unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].file_name().unwrap(), "tiles_All_Data.csv");
        assert_eq!(data_lines(&paths[0]).len(), 5);
    }

    #[test]
    fn test_split_preserves_rows_in_order() {
        let dir = TempDir::new().unwrap();
        let writer = SheetWriter::new().with_row_limit(4).unwrap();

        let paths = writer.write(&batch(10), &dir.path().join("tiles"), "Data").unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[2].file_name().unwrap(), "tiles_Data_3.csv");

        let all: Vec<String> = paths.iter().flat_map(|p| data_lines(p)).collect();
        let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(all, expected);
        assert_eq!(data_lines(&paths[2]).len(), 2);
    }

    #[test]
    fn test_exact_multiple_has_no_empty_sheet() {
        let writer = SheetWriter::new().with_row_limit(5).unwrap();
        assert_eq!(writer.sheet_count(10), 2);
        assert_eq!(writer.sheet_count(11), 3);
        assert_eq!(writer.sheet_count(0), 1);
    }

    #[test]
    fn test_invalid_row_limit() {
        assert!(SheetWriter::new().with_row_limit(0).is_err());
        assert!(SheetWriter::new().with_row_limit(SHEET_ROW_CAP + 1).is_err());
    }
}
