/// Run collection: enumerate seed log files in a results directory and parse
/// each one into a `RunRecord`.
use crate::parser::{self, Strategy};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Which file names in the results directory count as run logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConvention {
    /// Log file extension without the leading dot (e.g. "log").
    pub extension: String,
    /// Prefix stripped from file names to derive the seed (e.g. "seed_").
    pub seed_prefix: String,
    /// Only accept files that carry `seed_prefix`.
    pub seed_only: bool,
    /// File names never treated as run logs, e.g. the summary written back
    /// into the same directory.
    pub exclude: Vec<String>,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            extension: "log".to_string(),
            seed_prefix: "seed_".to_string(),
            seed_only: false,
            exclude: Vec::new(),
        }
    }
}

impl NamingConvention {
    /// Glob pattern matched against bare file names, e.g. `seed_*.log`.
    pub fn pattern(&self) -> String {
        let ext = glob::Pattern::escape(&self.extension);
        if self.seed_only {
            format!("{}*.{ext}", glob::Pattern::escape(&self.seed_prefix))
        } else {
            format!("*.{ext}")
        }
    }

    /// Whether `file_name` counts as a run log under this convention.
    pub fn accepts(&self, pattern: &glob::Pattern, file_name: &str) -> bool {
        pattern.matches(file_name) && !self.exclude.iter().any(|e| e == file_name)
    }

    /// Derive the run identifier from a file name.
    ///
    /// `seed_42.log` -> `42`, `baseline.log` -> `baseline`. Falls back to the
    /// bare file name when stripping would leave nothing.
    pub fn run_id(&self, file_name: &str) -> String {
        let suffix = format!(".{}", self.extension);
        let stem = file_name.strip_suffix(&suffix).unwrap_or(file_name);
        let id = stem.strip_prefix(&self.seed_prefix).unwrap_or(stem);
        if id.is_empty() {
            file_name.to_string()
        } else {
            id.to_string()
        }
    }
}

/// Metrics parsed from a single run's log.
#[derive(Debug, Clone)]
pub struct RunRecord {
    /// Seed or other identifier derived from the file name.
    pub id: String,
    /// Log file the metrics came from.
    pub source: PathBuf,
    /// Parser strategy that matched.
    pub strategy: Strategy,
    pub metrics: BTreeMap<String, f64>,
}

/// Result of scanning a results directory.
#[derive(Debug, Default)]
pub struct Collection {
    /// Runs with at least one metric, in file-name order.
    pub runs: Vec<RunRecord>,
    /// File names that were read but contained no recognizable metrics.
    pub empty: Vec<String>,
    /// File names that matched but could not be read.
    pub unreadable: Vec<String>,
}

impl Collection {
    /// Total number of matching files that were scanned.
    pub fn scanned(&self) -> usize {
        self.runs.len() + self.empty.len() + self.unreadable.len()
    }
}

/// Errors that abort collection of a whole directory.
#[derive(Debug)]
pub enum CollectError {
    /// The results directory does not exist or is not a directory.
    DirectoryNotFound { path: PathBuf },
    /// The directory exists but holds no file matching the naming convention.
    NoMatchingFiles { path: PathBuf, pattern: String },
    /// Listing the directory failed.
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The naming convention produced an unusable glob pattern.
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::DirectoryNotFound { path } => {
                write!(f, "directory not found: {}", path.display())
            }
            CollectError::NoMatchingFiles { path, pattern } => {
                write!(
                    f,
                    "no log files matching '{pattern}' in {}",
                    path.display()
                )
            }
            CollectError::ReadDir { path, source } => {
                write!(f, "failed to read directory {}: {source}", path.display())
            }
            CollectError::Pattern { pattern, source } => {
                write!(f, "invalid file pattern '{pattern}': {source}")
            }
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::ReadDir { source, .. } => Some(source),
            CollectError::Pattern { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Scan `dir` for run logs and parse each one.
///
/// Files are processed in lexicographic file-name order. Per-file problems
/// (unreadable file, no metrics) are logged and recorded in the returned
/// `Collection`; only directory-level problems are errors.
pub fn collect(dir: &Path, naming: &NamingConvention) -> Result<Collection, CollectError> {
    if !dir.is_dir() {
        return Err(CollectError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let files = list_log_files(dir, naming)?;
    if files.is_empty() {
        return Err(CollectError::NoMatchingFiles {
            path: dir.to_path_buf(),
            pattern: naming.pattern(),
        });
    }

    tracing::info!(count = files.len(), dir = %dir.display(), "found log files");

    Ok(parse_files(files, naming))
}

/// Read and parse each listed file, in the order given.
fn parse_files(files: Vec<(String, PathBuf)>, naming: &NamingConvention) -> Collection {
    let mut collection = Collection::default();
    for (file_name, path) in files {
        let text = match read_lossy(&path) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, file = %file_name, "failed to read log file, skipping");
                collection.unreadable.push(file_name);
                continue;
            }
        };

        let parsed = parser::parse_with_strategy(&text);
        let id = naming.run_id(&file_name);

        match parsed.strategy {
            Some(strategy) => {
                tracing::info!(
                    file = %file_name,
                    seed = %id,
                    metrics = parsed.metrics.len(),
                    %strategy,
                    "parsed log file"
                );
                collection.runs.push(RunRecord {
                    id,
                    source: path,
                    strategy,
                    metrics: parsed.metrics,
                });
            }
            None => {
                tracing::warn!(file = %file_name, "no metrics found in log file");
                collection.empty.push(file_name);
            }
        }
    }

    collection
}

/// List regular files whose name matches the convention, sorted by name.
fn list_log_files(
    dir: &Path,
    naming: &NamingConvention,
) -> Result<Vec<(String, PathBuf)>, CollectError> {
    let read_dir_err = |e| CollectError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    };

    let pattern_str = naming.pattern();
    let pattern = glob::Pattern::new(&pattern_str).map_err(|e| CollectError::Pattern {
        pattern: pattern_str.clone(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = match path.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => continue,
        };
        if naming.accepts(&pattern, &file_name) {
            files.push((file_name, path));
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Read a file, replacing invalid UTF-8 sequences instead of failing.
fn read_lossy(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
