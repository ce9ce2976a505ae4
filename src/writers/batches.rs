use crate::error::Result;
use crate::models::{
    AggregatedBin, AggregatedDataset, ComparisonDataset, StatSummary, TileColumns, TileDataset,
};
use crate::utils::constants::*;
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int32Array, StringArray, UInt64Array, UInt8Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Accumulates named columns for a record batch
#[derive(Default)]
struct BatchBuilder {
    fields: Vec<Field>,
    columns: Vec<ArrayRef>,
}

impl BatchBuilder {
    fn push(&mut self, name: &str, data_type: DataType, nullable: bool, array: ArrayRef) {
        self.fields.push(Field::new(name, data_type, nullable));
        self.columns.push(array);
    }

    fn utf8<I>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let array: StringArray = values.into_iter().collect();
        self.push(name, DataType::Utf8, true, Arc::new(array));
    }

    fn float64<I>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let array: Float64Array = values.into_iter().collect();
        self.push(name, DataType::Float64, true, Arc::new(array));
    }

    fn uint64<I>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = Option<u64>>,
    {
        let array: UInt64Array = values.into_iter().collect();
        self.push(name, DataType::UInt64, true, Arc::new(array));
    }

    fn period(&mut self, years: Vec<i32>, quarters: Vec<u8>) {
        self.push(COL_YEAR, DataType::Int32, false, Arc::new(Int32Array::from(years)));
        self.push(
            COL_QUARTER,
            DataType::UInt8,
            false,
            Arc::new(UInt8Array::from(quarters)),
        );
    }

    fn required_utf8(&mut self, name: &str, values: Vec<String>) {
        self.push(name, DataType::Utf8, false, Arc::new(StringArray::from(values)));
    }

    /// `<prefix>_mean`, `_min`, `_max` and optionally `_std`
    fn stats(&mut self, prefix: &str, stats: &[Option<StatSummary>], with_std: bool) {
        let column = |f: fn(&StatSummary) -> Option<f64>| -> Vec<Option<f64>> {
            stats.iter().map(|s| s.as_ref().and_then(f)).collect()
        };

        self.float64(&format!("{}_mean", prefix), column(|s| s.mean));
        self.float64(&format!("{}_min", prefix), column(|s| s.min));
        self.float64(&format!("{}_max", prefix), column(|s| s.max));
        if with_std {
            self.float64(&format!("{}_std", prefix), column(|s| s.std));
        }
    }

    fn finish(self) -> Result<RecordBatch> {
        let schema = Arc::new(Schema::new(self.fields));
        Ok(RecordBatch::try_new(schema, self.columns)?)
    }
}

/// Tile records as a batch holding only the columns the dataset carries
pub fn tiles_to_batch(dataset: &TileDataset) -> Result<RecordBatch> {
    let records = &dataset.records;
    let columns = dataset.columns;
    let mut builder = BatchBuilder::default();

    builder.required_utf8(COL_QUADKEY, records.iter().map(|r| r.quadkey.clone()).collect());

    if columns.download_kbps {
        builder.float64(COL_DOWNLOAD_KBPS, records.iter().map(|r| r.avg_d_kbps));
    }
    if columns.upload_kbps {
        builder.float64(COL_UPLOAD_KBPS, records.iter().map(|r| r.avg_u_kbps));
    }
    if columns.latency_ms {
        builder.float64(COL_LATENCY_MS, records.iter().map(|r| r.avg_lat_ms));
    }
    if columns.tests {
        builder.uint64(COL_TESTS, records.iter().map(|r| r.tests));
    }
    if columns.devices {
        builder.uint64(COL_DEVICES, records.iter().map(|r| r.devices));
    }

    builder.period(
        records.iter().map(|r| r.year).collect(),
        records.iter().map(|r| r.quarter).collect(),
    );
    builder.required_utf8(
        COL_DATA_TYPE,
        records.iter().map(|r| r.data_type.to_string()).collect(),
    );

    if columns.name {
        builder.utf8(COL_NAME, records.iter().map(|r| r.name.clone()));
    }
    if columns.region {
        builder.utf8(COL_REGION, records.iter().map(|r| r.region.clone()));
    }
    if columns.country {
        builder.utf8(COL_COUNTRY, records.iter().map(|r| r.country.clone()));
    }
    if columns.download_mbps {
        builder.float64(COL_DOWNLOAD_MBPS, records.iter().map(|r| r.avg_d_mbps));
    }
    if columns.upload_mbps {
        builder.float64(COL_UPLOAD_MBPS, records.iter().map(|r| r.avg_u_mbps));
    }
    if records.iter().any(|r| r.latitude.is_some() && r.longitude.is_some()) {
        builder.float64(COL_LATITUDE, records.iter().map(|r| r.latitude));
        builder.float64(COL_LONGITUDE, records.iter().map(|r| r.longitude));
    }

    builder.finish()
}

fn push_bin_columns(builder: &mut BatchBuilder, bins: &[&AggregatedBin], columns: TileColumns) {
    builder.required_utf8(COL_QUADKEY, bins.iter().map(|b| b.quadkey.clone()).collect());
    builder.period(
        bins.iter().map(|b| b.year).collect(),
        bins.iter().map(|b| b.quarter).collect(),
    );
    builder.required_utf8(
        COL_DATA_TYPE,
        bins.iter().map(|b| b.data_type.to_string()).collect(),
    );

    if columns.name {
        builder.utf8(COL_NAME, bins.iter().map(|b| b.name.clone()));
    }
    if columns.region {
        builder.utf8(COL_REGION, bins.iter().map(|b| b.region.clone()));
    }
    if columns.country {
        builder.utf8(COL_COUNTRY, bins.iter().map(|b| b.country.clone()));
    }
    builder.float64(COL_LATITUDE, bins.iter().map(|b| Some(b.latitude)));
    builder.float64(COL_LONGITUDE, bins.iter().map(|b| Some(b.longitude)));

    let stats = |f: fn(&AggregatedBin) -> Option<StatSummary>| -> Vec<Option<StatSummary>> {
        bins.iter().map(|b| f(b)).collect()
    };

    if columns.download_kbps {
        builder.stats(COL_DOWNLOAD_KBPS, &stats(|b| b.download_kbps), true);
    }
    if columns.upload_kbps {
        builder.stats(COL_UPLOAD_KBPS, &stats(|b| b.upload_kbps), true);
    }
    if columns.latency_ms {
        builder.stats(COL_LATENCY_MS, &stats(|b| b.latency_ms), false);
    }
    if columns.tests {
        builder.uint64(&format!("{}_sum", COL_TESTS), bins.iter().map(|b| b.tests_sum));
    }
    if columns.devices {
        builder.uint64(&format!("{}_sum", COL_DEVICES), bins.iter().map(|b| b.devices_sum));
    }
    if columns.download_mbps {
        builder.stats(COL_DOWNLOAD_MBPS, &stats(|b| b.download_mbps), true);
    }
    if columns.upload_mbps {
        builder.stats(COL_UPLOAD_MBPS, &stats(|b| b.upload_mbps), true);
    }
}

/// Aggregated bins with `<column>_<stat>` headers
pub fn bins_to_batch(dataset: &AggregatedDataset) -> Result<RecordBatch> {
    let bins: Vec<_> = dataset.bins.iter().collect();
    let mut builder = BatchBuilder::default();
    push_bin_columns(&mut builder, &bins, dataset.columns);
    builder.finish()
}

/// Comparison rows: the bin columns followed by baseline, quarter-over-quarter
/// and cumulative change columns
pub fn comparison_to_batch(dataset: &ComparisonDataset) -> Result<RecordBatch> {
    let records = &dataset.records;
    let bins: Vec<_> = records.iter().map(|r| &r.bin).collect();
    let mut builder = BatchBuilder::default();
    push_bin_columns(&mut builder, &bins, dataset.columns);

    builder.float64("baseline_d_kbps", records.iter().map(|r| r.baseline_d_kbps));
    builder.float64("baseline_u_kbps", records.iter().map(|r| r.baseline_u_kbps));
    builder.float64("d_kbps_pct_change", records.iter().map(|r| r.d_kbps_pct_change));
    builder.float64("u_kbps_pct_change", records.iter().map(|r| r.u_kbps_pct_change));
    builder.push(
        "time_period",
        DataType::Float64,
        false,
        Arc::new(Float64Array::from(
            records.iter().map(|r| r.time_period).collect::<Vec<_>>(),
        )),
    );
    builder.float64("d_kbps_qoq_change", records.iter().map(|r| r.d_kbps_qoq_change));
    builder.float64("u_kbps_qoq_change", records.iter().map(|r| r.u_kbps_qoq_change));
    builder.push(
        "is_year_transition",
        DataType::Boolean,
        false,
        Arc::new(BooleanArray::from(
            records.iter().map(|r| r.is_year_transition).collect::<Vec<_>>(),
        )),
    );
    builder.float64(
        "d_kbps_cumulative_change",
        records.iter().map(|r| r.d_kbps_cumulative_change),
    );
    builder.float64(
        "u_kbps_cumulative_change",
        records.iter().map(|r| r.u_kbps_cumulative_change),
    );

    builder.finish()
}
