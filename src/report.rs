//! Summary rendering and persistence.
//!
//! The text summary has a fixed layout and no timestamps, so re-running over
//! an unchanged results directory produces a byte-identical file.

use crate::aggregate::{AggregateStat, MetricSeries};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Layout knobs for the text summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLayout {
    pub title: String,
    /// Column width the metric key is padded to.
    pub key_width: usize,
    /// Decimal places for means, deviations and individual values.
    pub precision: usize,
    /// Length of the `=` separator rule.
    pub rule_width: usize,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            title: "Multi-Seed Results".to_string(),
            key_width: 20,
            precision: 4,
            rule_width: 70,
        }
    }
}

impl ReportLayout {
    fn rule(&self) -> String {
        "=".repeat(self.rule_width)
    }

    /// `recall@10           : 0.3000 ± 0.0200  (n=3)`
    pub fn stat_line(&self, stat: &AggregateStat) -> String {
        format!(
            "{:<kw$}: {:.p$} ± {:.p$}  (n={})",
            stat.key,
            stat.mean,
            stat.std_dev,
            stat.count,
            kw = self.key_width,
            p = self.precision,
        )
    }

    /// `recall@10: [0.3000, 0.3200, 0.2800]`
    pub fn values_line(&self, key: &str, values: &[f64]) -> String {
        let values = values
            .iter()
            .map(|v| format!("{v:.p$}", p = self.precision))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{key}: [{values}]")
    }
}

/// Render the statistics table alone, as printed to the console.
pub fn render_table(stats: &BTreeMap<String, AggregateStat>, layout: &ReportLayout) -> String {
    let mut out = String::new();
    for stat in stats.values() {
        out.push_str(&layout.stat_line(stat));
        out.push('\n');
    }
    out
}

/// Render the full summary file contents.
pub fn render_summary(
    stats: &BTreeMap<String, AggregateStat>,
    series: &MetricSeries,
    layout: &ReportLayout,
) -> String {
    let rule = layout.rule();
    let mut out = format!("{}\n{rule}\n\n", layout.title);
    out.push_str(&render_table(stats, layout));
    out.push_str(&format!("\n{rule}\nIndividual Values:\n\n"));
    for (key, values) in series {
        out.push_str(&layout.values_line(key, values));
        out.push('\n');
    }
    out
}

/// Print the final table to stdout.
pub fn print_summary(stats: &BTreeMap<String, AggregateStat>, layout: &ReportLayout) {
    let rule = layout.rule();
    println!("\n{rule}");
    println!("RESULTS: Mean ± Standard Deviation");
    println!("{rule}");
    print!("{}", render_table(stats, layout));
}

/// JSON export payload.
#[derive(Debug, Serialize)]
struct JsonSummary<'a> {
    metrics: Vec<&'a AggregateStat>,
    values: &'a MetricSeries,
}

/// Errors from writing summary files.
#[derive(Debug)]
pub enum ReportError {
    /// Failed to write the temporary file.
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to move the temporary file into place.
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize the JSON export.
    Serialize { source: serde_json::Error },
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Write { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
            ReportError::Rename { from, to, source } => {
                write!(
                    f,
                    "failed to rename {} to {}: {source}",
                    from.display(),
                    to.display()
                )
            }
            ReportError::Serialize { source } => {
                write!(f, "failed to serialize summary: {source}")
            }
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Write { source, .. } => Some(source),
            ReportError::Rename { source, .. } => Some(source),
            ReportError::Serialize { source } => Some(source),
        }
    }
}

/// Write the text summary to `destination`.
pub fn write_summary(
    stats: &BTreeMap<String, AggregateStat>,
    series: &MetricSeries,
    destination: &Path,
    layout: &ReportLayout,
) -> Result<(), ReportError> {
    write_atomic(destination, &render_summary(stats, series, layout))
}

/// Write the statistics and raw values as pretty-printed JSON.
pub fn write_json(
    stats: &BTreeMap<String, AggregateStat>,
    series: &MetricSeries,
    destination: &Path,
) -> Result<(), ReportError> {
    let summary = JsonSummary {
        metrics: stats.values().collect(),
        values: series,
    };
    let mut json = serde_json::to_string_pretty(&summary)
        .map_err(|e| ReportError::Serialize { source: e })?;
    json.push('\n');
    write_atomic(destination, &json)
}

/// Write to a temporary sibling file, then rename over `destination` so a
/// reader never sees a partial summary.
fn write_atomic(destination: &Path, contents: &str) -> Result<(), ReportError> {
    let dir = destination.parent().unwrap_or(Path::new("."));
    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "summary".to_string());
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

    std::fs::write(&tmp_path, contents.as_bytes()).map_err(|e| ReportError::Write {
        path: tmp_path.clone(),
        source: e,
    })?;

    if let Err(e) = std::fs::rename(&tmp_path, destination) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ReportError::Rename {
            from: tmp_path,
            to: destination.to_path_buf(),
            source: e,
        });
    }

    Ok(())
}
