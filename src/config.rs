use crate::collector::NamingConvention;
use crate::report::ReportLayout;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "seedstats.toml";

/// Summary file written inside the results directory.
pub const DEFAULT_OUTPUT_FILE: &str = "statistics_summary.txt";

/// Top-level configuration loaded from seedstats.toml.
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StatsConfig {
    pub collector: CollectorConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectorConfig {
    pub extension: String,
    pub seed_prefix: String,
    pub seed_only: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub output_file: String,
    pub title: String,
    pub key_width: usize,
    pub precision: usize,
    pub rule_width: usize,
}

// --- Default implementations ---

impl Default for CollectorConfig {
    fn default() -> Self {
        let naming = NamingConvention::default();
        Self {
            extension: naming.extension,
            seed_prefix: naming.seed_prefix,
            seed_only: naming.seed_only,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        let layout = ReportLayout::default();
        Self {
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            title: layout.title,
            key_width: layout.key_width,
            precision: layout.precision,
            rule_width: layout.rule_width,
        }
    }
}

impl CollectorConfig {
    pub fn naming(&self) -> NamingConvention {
        NamingConvention {
            extension: self.extension.clone(),
            seed_prefix: self.seed_prefix.clone(),
            seed_only: self.seed_only,
            ..Default::default()
        }
    }
}

impl ReportConfig {
    pub fn layout(&self) -> ReportLayout {
        ReportLayout {
            title: self.title.clone(),
            key_width: self.key_width,
            precision: self.precision,
            rule_width: self.rule_width,
        }
    }
}

/// Errors from loading the config file.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

/// Load configuration from `path`.
///
/// A missing file falls back to defaults unless `required` is set (the user
/// named the file explicitly on the command line).
pub fn load_config(path: &Path, required: bool) -> Result<StatsConfig, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(StatsConfig::default());
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}
