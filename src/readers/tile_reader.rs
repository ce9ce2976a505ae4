use crate::error::{ProcessingError, Result};
use crate::models::{DataType, RawTile, RawTileTable, TileColumns, TileDataset, TileRecord};
use crate::utils::constants::*;
use arrow::array::{Array, ArrayRef, Float64Array, Int32Array, StringArray, UInt64Array, UInt8Array};
use arrow::compute::cast;
use arrow::datatypes::DataType as ArrowType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use validator::Validate;

/// Reads tile tables from Parquet, normalising column types on the way in
#[derive(Debug, Clone)]
pub struct TileReader {
    batch_size: usize,
}

impl TileReader {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Read an upstream tile file: quadkey, optional WKT `tile` polygon and measures
    pub fn read_raw(&self, path: &Path) -> Result<RawTileTable> {
        let batches = self.read_batches(path)?;
        let mut table = RawTileTable::default();

        for batch in &batches {
            let quadkeys = required_column::<StringArray>(batch, COL_QUADKEY, &ArrowType::Utf8)?;
            let tile_wkt = optional_column::<StringArray>(batch, COL_TILE, &ArrowType::Utf8)?;
            let measures = Measures::from_batch(batch)?;
            table.columns = table.columns.union(measures.columns());

            for i in 0..batch.num_rows() {
                let quadkey = value_str(&quadkeys, i).ok_or_else(|| {
                    ProcessingError::MissingData(format!("Null quadkey in {}", path.display()))
                })?;

                let mut tile = RawTile::new(quadkey);
                tile.tile_wkt = tile_wkt.as_ref().and_then(|a| value_str(a, i));
                tile.avg_d_kbps = value_f64(&measures.download_kbps, i);
                tile.avg_u_kbps = value_f64(&measures.upload_kbps, i);
                tile.avg_lat_ms = value_f64(&measures.latency_ms, i);
                tile.tests = value_u64(&measures.tests, i);
                tile.devices = value_u64(&measures.devices, i);
                table.tiles.push(tile);
            }
        }

        info!("Loaded {} raw tiles from {}", table.tiles.len(), path.display());
        Ok(table)
    }

    /// Read a region-filtered tile file carrying year, quarter and data type
    pub fn read_tiles(&self, path: &Path) -> Result<TileDataset> {
        let batches = self.read_batches(path)?;
        let mut dataset = TileDataset::default();

        for batch in &batches {
            let quadkeys = required_column::<StringArray>(batch, COL_QUADKEY, &ArrowType::Utf8)?;
            let years = required_column::<Int32Array>(batch, COL_YEAR, &ArrowType::Int32)?;
            let quarters = required_column::<UInt8Array>(batch, COL_QUARTER, &ArrowType::UInt8)?;
            let data_types = required_column::<StringArray>(batch, COL_DATA_TYPE, &ArrowType::Utf8)?;
            let names = optional_column::<StringArray>(batch, COL_NAME, &ArrowType::Utf8)?;
            let regions = optional_column::<StringArray>(batch, COL_REGION, &ArrowType::Utf8)?;
            let countries = optional_column::<StringArray>(batch, COL_COUNTRY, &ArrowType::Utf8)?;
            let latitudes = optional_column::<Float64Array>(batch, COL_LATITUDE, &ArrowType::Float64)?;
            let longitudes = optional_column::<Float64Array>(batch, COL_LONGITUDE, &ArrowType::Float64)?;
            let measures = Measures::from_batch(batch)?;

            let mut columns = measures.columns();
            columns.name = names.is_some();
            columns.region = regions.is_some();
            columns.country = countries.is_some();
            dataset.columns = if dataset.records.is_empty() {
                columns
            } else {
                dataset.columns.union(columns)
            };

            for i in 0..batch.num_rows() {
                let missing = |column: &str| {
                    ProcessingError::MissingData(format!(
                        "Null {} at row {} of {}",
                        column,
                        i,
                        path.display()
                    ))
                };

                let quadkey = value_str(&quadkeys, i).ok_or_else(|| missing(COL_QUADKEY))?;
                let year = years.is_valid(i).then(|| years.value(i)).ok_or_else(|| missing(COL_YEAR))?;
                let quarter = quarters
                    .is_valid(i)
                    .then(|| quarters.value(i))
                    .ok_or_else(|| missing(COL_QUARTER))?;
                let data_type: DataType = value_str(&data_types, i)
                    .ok_or_else(|| missing(COL_DATA_TYPE))?
                    .parse()?;

                let mut record = TileRecord::new(quadkey, year, quarter, data_type);
                record.avg_d_kbps = value_f64(&measures.download_kbps, i);
                record.avg_u_kbps = value_f64(&measures.upload_kbps, i);
                record.avg_lat_ms = value_f64(&measures.latency_ms, i);
                record.avg_d_mbps = value_f64(&measures.download_mbps, i);
                record.avg_u_mbps = value_f64(&measures.upload_mbps, i);
                record.tests = value_u64(&measures.tests, i);
                record.devices = value_u64(&measures.devices, i);
                record.name = names.as_ref().and_then(|a| value_str(a, i));
                record.region = regions.as_ref().and_then(|a| value_str(a, i));
                record.country = countries.as_ref().and_then(|a| value_str(a, i));
                record.latitude = value_f64(&latitudes, i);
                record.longitude = value_f64(&longitudes, i);

                record.validate()?;
                dataset.records.push(record);
            }
        }

        info!("Loaded {} tile records from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Read several tile files concurrently, returning them in input order
    pub async fn read_many(&self, paths: Vec<PathBuf>) -> Result<Vec<TileDataset>> {
        let handles: Vec<_> = paths
            .into_iter()
            .map(|path| {
                let reader = self.clone();
                tokio::task::spawn_blocking(move || reader.read_tiles(&path))
            })
            .collect();

        let mut datasets = Vec::with_capacity(handles.len());
        for handle in handles {
            datasets.push(handle.await??);
        }
        Ok(datasets)
    }

    fn read_batches(&self, path: &Path) -> Result<Vec<RecordBatch>> {
        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(self.batch_size)
            .build()?;

        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        debug!("Read {} batches from {}", batches.len(), path.display());
        Ok(batches)
    }
}

impl Default for TileReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Optional measurement columns of one batch
struct Measures {
    download_kbps: Option<Float64Array>,
    upload_kbps: Option<Float64Array>,
    latency_ms: Option<Float64Array>,
    download_mbps: Option<Float64Array>,
    upload_mbps: Option<Float64Array>,
    tests: Option<UInt64Array>,
    devices: Option<UInt64Array>,
}

impl Measures {
    fn from_batch(batch: &RecordBatch) -> Result<Self> {
        let float = |name| optional_column::<Float64Array>(batch, name, &ArrowType::Float64);
        let count = |name| optional_column::<UInt64Array>(batch, name, &ArrowType::UInt64);

        Ok(Self {
            download_kbps: float(COL_DOWNLOAD_KBPS)?,
            upload_kbps: float(COL_UPLOAD_KBPS)?,
            latency_ms: float(COL_LATENCY_MS)?,
            download_mbps: float(COL_DOWNLOAD_MBPS)?,
            upload_mbps: float(COL_UPLOAD_MBPS)?,
            tests: count(COL_TESTS)?,
            devices: count(COL_DEVICES)?,
        })
    }

    fn columns(&self) -> TileColumns {
        TileColumns {
            download_kbps: self.download_kbps.is_some(),
            upload_kbps: self.upload_kbps.is_some(),
            latency_ms: self.latency_ms.is_some(),
            download_mbps: self.download_mbps.is_some(),
            upload_mbps: self.upload_mbps.is_some(),
            tests: self.tests.is_some(),
            devices: self.devices.is_some(),
            ..TileColumns::default()
        }
    }
}

/// Column `name` cast to `target`, or None when the batch lacks it
fn optional_column<A>(batch: &RecordBatch, name: &str, target: &ArrowType) -> Result<Option<A>>
where
    A: Array + Clone + 'static,
{
    let Some(column) = batch.column_by_name(name) else {
        return Ok(None);
    };

    let casted: ArrayRef = cast(column, target)?;
    let array = casted.as_any().downcast_ref::<A>().cloned().ok_or_else(|| {
        ProcessingError::InvalidFormat(format!("Column {} could not be read as {}", name, target))
    })?;
    Ok(Some(array))
}

fn required_column<A>(batch: &RecordBatch, name: &str, target: &ArrowType) -> Result<A>
where
    A: Array + Clone + 'static,
{
    optional_column(batch, name, target)?
        .ok_or_else(|| ProcessingError::MissingData(format!("Required column '{}' not found", name)))
}

fn value_str(array: &StringArray, i: usize) -> Option<String> {
    array.is_valid(i).then(|| array.value(i).to_string())
}

fn value_f64(array: &Option<Float64Array>, i: usize) -> Option<f64> {
    array
        .as_ref()
        .and_then(|a| a.is_valid(i).then(|| a.value(i)))
        .filter(|v| !v.is_nan())
}

fn value_u64(array: &Option<UInt64Array>, i: usize) -> Option<u64> {
    array.as_ref().and_then(|a| a.is_valid(i).then(|| a.value(i)))
}
