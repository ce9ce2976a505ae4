use crate::error::{ProcessingError, Result};
use crate::models::{AggregatedBin, AggregatedDataset, ComparisonDataset, ComparisonRecord, Period};
use std::collections::HashMap;
use tracing::{debug, info};

/// Percentage change of `value` relative to `reference`; null when either side
/// is missing, the reference is zero, or the change is not finite.
pub fn percent_change(value: Option<f64>, reference: Option<f64>) -> Option<f64> {
    match (value, reference) {
        (Some(v), Some(r)) if r != 0.0 && v.is_finite() && r.is_finite() => {
            Some((v - r) / r * 100.0).filter(|change| change.is_finite())
        }
        _ => None,
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| !v.is_nan()) {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Per-quadkey download and upload means over the baseline period
fn baseline_means(bins: &[AggregatedBin], baseline: Period) -> HashMap<&str, (Option<f64>, Option<f64>)> {
    let mut acc: HashMap<&str, (RunningMean, RunningMean)> = HashMap::new();
    for bin in bins.iter().filter(|b| b.period() == baseline) {
        let entry = acc.entry(bin.quadkey.as_str()).or_default();
        entry.0.add(bin.download_mean());
        entry.1.add(bin.upload_mean());
    }

    acc.into_iter()
        .map(|(quadkey, (down, up))| (quadkey, (down.mean(), up.mean())))
        .collect()
}

/// Compare every bin against its quadkey's baseline and previous period.
///
/// The baseline is the earliest period present. Rows come back sorted by
/// quadkey then period; the previous period of a row is whatever row precedes
/// it for the same quadkey, so gaps are skipped rather than filled.
pub fn compare_to_baseline(dataset: &AggregatedDataset) -> Result<ComparisonDataset> {
    let baseline = dataset
        .bins
        .iter()
        .map(|b| b.period())
        .min_by_key(|p| p.index())
        .ok_or_else(|| ProcessingError::NoBaseline("input has no rows".to_string()))?;

    if !dataset.columns.download_kbps && !dataset.columns.upload_kbps {
        return Err(ProcessingError::MissingData(
            "comparison needs a download or upload speed column".to_string(),
        ));
    }

    info!("Using {} as baseline period", baseline);

    let baselines = baseline_means(&dataset.bins, baseline);
    debug!("{} quadkeys present in baseline period", baselines.len());

    let mut bins: Vec<&AggregatedBin> = dataset.bins.iter().collect();
    bins.sort_by(|a, b| {
        a.quadkey
            .cmp(&b.quadkey)
            .then(a.year.cmp(&b.year))
            .then(a.quarter.cmp(&b.quarter))
    });

    let mut records = Vec::with_capacity(bins.len());
    let mut previous: Option<&AggregatedBin> = None;

    for bin in bins {
        let prev = previous.filter(|p| p.quadkey == bin.quadkey);
        let (baseline_d_kbps, baseline_u_kbps) = baselines
            .get(bin.quadkey.as_str())
            .copied()
            .unwrap_or((None, None));

        let d_kbps_pct_change = percent_change(bin.download_mean(), baseline_d_kbps);
        let u_kbps_pct_change = percent_change(bin.upload_mean(), baseline_u_kbps);

        let prev_d_kbps = prev.and_then(|p| p.download_mean());
        let prev_u_kbps = prev.and_then(|p| p.upload_mean());

        let is_year_transition = prev
            .map(|p| bin.quarter == 1 && p.quarter == 4 && p.year != bin.year)
            .unwrap_or(false);

        records.push(ComparisonRecord {
            bin: bin.clone(),
            baseline_d_kbps,
            baseline_u_kbps,
            d_kbps_pct_change,
            u_kbps_pct_change,
            time_period: bin.period().time_period(),
            prev_year: prev.map(|p| p.year),
            prev_quarter: prev.map(|p| p.quarter),
            prev_d_kbps,
            prev_u_kbps,
            d_kbps_qoq_change: percent_change(bin.download_mean(), prev_d_kbps),
            u_kbps_qoq_change: percent_change(bin.upload_mean(), prev_u_kbps),
            is_year_transition,
            d_kbps_cumulative_change: d_kbps_pct_change,
            u_kbps_cumulative_change: u_kbps_pct_change,
        });

        previous = Some(bin);
    }

    Ok(ComparisonDataset {
        baseline,
        columns: dataset.columns,
        records,
    })
}
