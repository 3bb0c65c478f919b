/// End-to-end pipeline: collect run logs, aggregate, report.
use crate::aggregate::{self, AggregateStat, MetricSeries};
use crate::collector::{self, CollectError, Collection, NamingConvention};
use crate::report::{self, ReportError, ReportLayout};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of the optional JSON export, written next to the text summary.
pub const JSON_SUMMARY_FILE: &str = "statistics_summary.json";

/// Everything the pipeline needs besides the results directory.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub naming: NamingConvention,
    pub layout: ReportLayout,
    /// Summary file name, created inside the results directory.
    pub output_file: String,
    pub write_json: bool,
    /// Print per-file metrics and the final table to stdout.
    pub print: bool,
}

/// Outcome of a successful pipeline run.
#[derive(Debug)]
pub struct Summary {
    pub collection: Collection,
    pub series: MetricSeries,
    pub stats: BTreeMap<String, AggregateStat>,
    pub output_path: PathBuf,
    pub json_path: Option<PathBuf>,
}

/// Errors that end a pipeline run.
#[derive(Debug)]
pub enum PipelineError {
    Collect(CollectError),
    /// Log files were found but none contained a recognizable metric.
    NoMetrics { path: PathBuf, scanned: usize },
    Report(ReportError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Collect(e) => write!(f, "{e}"),
            PipelineError::NoMetrics { path, scanned } => {
                write!(
                    f,
                    "no metrics found in any of {scanned} log file(s) in {}",
                    path.display()
                )
            }
            PipelineError::Report(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Collect(e) => Some(e),
            PipelineError::NoMetrics { .. } => None,
            PipelineError::Report(e) => Some(e),
        }
    }
}

impl From<CollectError> for PipelineError {
    fn from(e: CollectError) -> Self {
        PipelineError::Collect(e)
    }
}

impl From<ReportError> for PipelineError {
    fn from(e: ReportError) -> Self {
        PipelineError::Report(e)
    }
}

/// Run the full pipeline over `results_dir`.
///
/// The final table is printed before the summary file is written, so results
/// stay visible even when persisting them fails. With printing disabled the
/// table is still printed if the summary cannot be written.
pub fn run(results_dir: &Path, options: &PipelineOptions) -> Result<Summary, PipelineError> {
    // Never read our own summaries back in as runs
    let mut naming = options.naming.clone();
    naming.exclude.push(options.output_file.clone());
    naming.exclude.push(JSON_SUMMARY_FILE.to_string());
    let collection = collector::collect(results_dir, &naming)?;

    if options.print {
        print_runs(&collection, options.layout.precision);
    }

    if collection.runs.is_empty() {
        return Err(PipelineError::NoMetrics {
            path: results_dir.to_path_buf(),
            scanned: collection.scanned(),
        });
    }

    let series = aggregate::group_series(&collection.runs);
    let stats = aggregate::summarize(&series);

    if options.print {
        report::print_summary(&stats, &options.layout);
    }

    let output_path = results_dir.join(&options.output_file);
    if let Err(e) = report::write_summary(&stats, &series, &output_path, &options.layout) {
        if !options.print {
            report::print_summary(&stats, &options.layout);
        }
        return Err(e.into());
    }
    tracing::info!(path = %output_path.display(), metrics = stats.len(), "wrote summary");

    let json_path = if options.write_json {
        let path = results_dir.join(JSON_SUMMARY_FILE);
        report::write_json(&stats, &series, &path)?;
        tracing::info!(path = %path.display(), "wrote JSON summary");
        Some(path)
    } else {
        None
    };

    Ok(Summary {
        collection,
        series,
        stats,
        output_path,
        json_path,
    })
}

fn print_runs(collection: &Collection, precision: usize) {
    for run in &collection.runs {
        println!("Seed {}: {} metrics", run.id, run.metrics.len());
        for (key, value) in &run.metrics {
            println!("    {key}: {value:.precision$}");
        }
    }
    for file in &collection.empty {
        println!("Warning: no metrics found in {file}");
    }
    for file in &collection.unreadable {
        println!("Warning: could not read {file}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn options() -> PipelineOptions {
        PipelineOptions {
            naming: NamingConvention::default(),
            layout: ReportLayout::default(),
            output_file: "statistics_summary.txt".to_string(),
            write_json: false,
            print: false,
        }
    }

    fn write_three_seeds(dir: &Path) {
        std::fs::write(dir.join("seed_1.log"), "recall@10 : 0.30\n").unwrap();
        std::fs::write(dir.join("seed_2.log"), "Recall@10 = 0.32\n").unwrap();
        std::fs::write(
            dir.join("seed_3.log"),
            "INFO test result: {'recall@10': 0.28, 'ndcg@10': 0.11}\nrecall@10 : 0.99\n",
        )
        .unwrap();
    }

    #[test]
    fn test_end_to_end_three_seeds() {
        let dir = tempdir().unwrap();
        write_three_seeds(dir.path());

        let summary = run(dir.path(), &options()).unwrap();
        let recall = &summary.stats["recall@10"];
        assert_eq!(recall.count, 3);
        assert!((recall.mean - 0.30).abs() < 1e-9);
        assert!((recall.std_dev - 0.02).abs() < 1e-9);

        let ndcg = &summary.stats["ndcg@10"];
        assert_eq!(ndcg.count, 1);
        assert_eq!(ndcg.std_dev, 0.0);

        let contents = std::fs::read_to_string(&summary.output_path).unwrap();
        assert!(contents.contains("recall@10           : 0.3000 ± 0.0200  (n=3)"));
        assert!(contents.contains("recall@10: [0.3000, 0.3200, 0.2800]"));
        assert!(summary.json_path.is_none());
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let dir = tempdir().unwrap();
        write_three_seeds(dir.path());

        let first = run(dir.path(), &options()).unwrap();
        let before = std::fs::read(&first.output_path).unwrap();
        let second = run(dir.path(), &options()).unwrap();
        let after = std::fs::read(&second.output_path).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_summary_file_not_picked_up_as_log() {
        let dir = tempdir().unwrap();
        write_three_seeds(dir.path());
        run(dir.path(), &options()).unwrap();
        let summary = run(dir.path(), &options()).unwrap();
        assert_eq!(summary.collection.scanned(), 3);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("results_multiple_seeds");
        let err = run(&missing, &options()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Collect(CollectError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn test_no_matching_files_writes_nothing() {
        let dir = tempdir().unwrap();
        let err = run(dir.path(), &options()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Collect(CollectError::NoMatchingFiles { .. })
        ));
        assert!(!dir.path().join("statistics_summary.txt").exists());
    }

    #[test]
    fn test_only_log_without_metrics() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("seed_1.log"), "CUDA out of memory\n").unwrap();

        let err = run(dir.path(), &options()).unwrap_err();
        match err {
            PipelineError::NoMetrics { scanned, .. } => assert_eq!(scanned, 1),
            other => panic!("expected NoMetrics, got {other:?}"),
        }
        assert!(!dir.path().join("statistics_summary.txt").exists());
    }

    #[test]
    fn test_some_logs_without_metrics_still_succeed() {
        let dir = tempdir().unwrap();
        write_three_seeds(dir.path());
        std::fs::write(dir.path().join("seed_4.log"), "killed\n").unwrap();

        let summary = run(dir.path(), &options()).unwrap();
        assert_eq!(summary.collection.empty, vec!["seed_4.log".to_string()]);
        assert_eq!(summary.stats["recall@10"].count, 3);
    }

    #[test]
    fn test_json_export() {
        let dir = tempdir().unwrap();
        write_three_seeds(dir.path());
        let opts = PipelineOptions {
            write_json: true,
            ..options()
        };

        let summary = run(dir.path(), &opts).unwrap();
        let json_path = summary.json_path.unwrap();
        assert_eq!(json_path, dir.path().join(JSON_SUMMARY_FILE));
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(value["metrics"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_rerun_with_txt_extension_ignores_summary() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("seed_1.txt"), "recall@10 : 0.30\n").unwrap();
        std::fs::write(dir.path().join("seed_2.txt"), "recall@10 : 0.32\n").unwrap();
        std::fs::write(dir.path().join("seed_3.txt"), "recall@10 : 0.28\n").unwrap();
        let opts = PipelineOptions {
            naming: NamingConvention {
                extension: "txt".to_string(),
                ..Default::default()
            },
            ..options()
        };

        let first = run(dir.path(), &opts).unwrap();
        let before = std::fs::read(&first.output_path).unwrap();
        let second = run(dir.path(), &opts).unwrap();
        let after = std::fs::read(&second.output_path).unwrap();

        assert_eq!(second.collection.runs.len(), 3);
        assert_eq!(second.stats["recall@10"].count, 3);
        assert_eq!(before, after);
    }

    #[test]
    fn test_rerun_with_json_extension_ignores_json_summary() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("seed_1.json"), "recall@10 : 0.30\n").unwrap();
        let opts = PipelineOptions {
            naming: NamingConvention {
                extension: "json".to_string(),
                ..Default::default()
            },
            write_json: true,
            ..options()
        };

        run(dir.path(), &opts).unwrap();
        let second = run(dir.path(), &opts).unwrap();
        assert_eq!(second.collection.scanned(), 1);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempdir().unwrap();
        write_three_seeds(dir.path());
        let opts = PipelineOptions {
            output_file: "missing/summary.txt".to_string(),
            ..options()
        };

        let err = run(dir.path(), &opts).unwrap_err();
        assert!(matches!(err, PipelineError::Report(_)));
        assert!(err.to_string().contains("failed to write"));
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn test_custom_output_file_name() {
        let dir = tempdir().unwrap();
        write_three_seeds(dir.path());
        let opts = PipelineOptions {
            output_file: "duorec_summary.txt".to_string(),
            ..options()
        };
        let summary = run(dir.path(), &opts).unwrap();
        assert_eq!(summary.output_path, dir.path().join("duorec_summary.txt"));
        assert!(summary.output_path.exists());
    }
}
