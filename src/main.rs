use clap::Parser;
use seedstats::collector::CollectError;
use seedstats::config;
use seedstats::pipeline::{self, PipelineError, PipelineOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Aggregate evaluation metrics across independently-seeded experiment runs:
/// parse every run log, merge metrics by name, and report mean ± sample
/// standard deviation per metric.
#[derive(Parser, Debug)]
#[command(name = "seedstats", version, about)]
pub struct Cli {
    /// Directory holding one log file per seed
    #[arg(value_name = "RESULTS_DIR", default_value = "./results_multiple_seeds")]
    results_dir: PathBuf,

    /// Config file path (default: seedstats.toml, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only read files named <seed_prefix>*.<extension> (overrides config)
    #[arg(long)]
    seed_only: bool,

    /// Log file extension without the dot (overrides config)
    #[arg(long)]
    extension: Option<String>,

    /// Summary file name inside RESULTS_DIR (overrides config)
    #[arg(short, long)]
    output: Option<String>,

    /// Also write statistics_summary.json
    #[arg(long)]
    json: bool,

    /// Extra logging (per-pair parser decisions)
    #[arg(short, long)]
    verbose: bool,

    /// Only warnings and errors, no per-file progress
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(PipelineError::Collect(CollectError::DirectoryNotFound { .. })) =
                e.downcast_ref::<PipelineError>()
            {
                eprintln!("Run the seeded experiments first so their logs land in this directory.");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (config_path, required) = match &cli.config {
        Some(p) => (p.as_path(), true),
        None => (Path::new(config::DEFAULT_CONFIG_FILE), false),
    };
    let cfg = config::load_config(config_path, required)?;

    let mut naming = cfg.collector.naming();
    if cli.seed_only {
        naming.seed_only = true;
    }
    if let Some(ext) = &cli.extension {
        naming.extension = ext.trim_start_matches('.').to_string();
    }

    let options = PipelineOptions {
        naming,
        layout: cfg.report.layout(),
        output_file: cli
            .output
            .clone()
            .unwrap_or_else(|| cfg.report.output_file.clone()),
        write_json: cli.json,
        print: !cli.quiet,
    };

    let summary = pipeline::run(&cli.results_dir, &options)?;

    if !cli.quiet {
        println!("\nResults saved to: {}", summary.output_path.display());
        if let Some(json) = &summary.json_path {
            println!("JSON saved to: {}", json.display());
        }
    }

    if !summary.collection.empty.is_empty() || !summary.collection.unreadable.is_empty() {
        tracing::warn!(
            empty = summary.collection.empty.len(),
            unreadable = summary.collection.unreadable.len(),
            "some log files contributed no metrics"
        );
    }

    Ok(())
}
