//! Cross-run aggregation of metric values.
//!
//! Values are grouped by metric key in run-processing order, then reduced to
//! mean and sample standard deviation. A metric missing from some runs is
//! aggregated over the runs that reported it; nothing is imputed.

use crate::collector::RunRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Metric key -> observed values, one per reporting run, in run order.
pub type MetricSeries = BTreeMap<String, Vec<f64>>;

/// Summary statistics for one metric across runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStat {
    pub key: String,
    pub mean: f64,
    /// Sample standard deviation (n-1 divisor); 0.0 for a single observation.
    pub std_dev: f64,
    /// Number of runs that reported this metric.
    pub count: usize,
}

impl AggregateStat {
    /// Compute statistics over `values`. Returns `None` for an empty slice.
    pub fn from_values(key: &str, values: &[f64]) -> Option<Self> {
        let count = values.len();
        if count == 0 {
            return None;
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let std_dev = if count < 2 {
            0.0
        } else {
            let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (sum_sq / (count - 1) as f64).sqrt()
        };

        Some(Self {
            key: key.to_string(),
            mean,
            std_dev,
            count,
        })
    }
}

/// Group every (key, value) pair across runs into per-metric series.
pub fn group_series(records: &[RunRecord]) -> MetricSeries {
    let mut series = MetricSeries::new();
    for record in records {
        for (key, value) in &record.metrics {
            series.entry(key.clone()).or_default().push(*value);
        }
    }
    series
}

/// Reduce each series to its statistics.
pub fn summarize(series: &MetricSeries) -> BTreeMap<String, AggregateStat> {
    series
        .iter()
        .filter_map(|(key, values)| {
            AggregateStat::from_values(key, values).map(|stat| (key.clone(), stat))
        })
        .collect()
}

/// Aggregate per-run metrics into per-metric statistics.
pub fn aggregate(records: &[RunRecord]) -> BTreeMap<String, AggregateStat> {
    summarize(&group_series(records))
}
