use crate::config::parse::{load_config, ConfigError};
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::pipeline::{run_pipeline, PipelineError, PipelineOptions, PipelineSummary};
use crate::source::{discover_files, ReaderError};
use crate::storage::{open_directory, SinkError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("source discovery error: {0}")]
    Source(#[from] ReaderError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/{}", crate::config::USER_CONFIG);
            eprintln!("  {}", crate::config::SYSTEM_CONFIG);
            eprintln!("\nUse --config <path> to specify a config file, or run 'jobtrail config init' to generate one.");
            std::process::exit(1);
        }
    };

    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(&config_path)?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    let signal_handle = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, draining what was read so far");
            signal_cancel.cancel();
        }
    });

    let result = run_with_config(&config, cancel).await;
    signal_handle.abort();

    result.map(|_| ()).map_err(|e| e.into())
}

/// Run the whole pipeline for an already loaded config.
pub async fn run_with_config(
    config: &Config,
    cancel: CancellationToken,
) -> Result<PipelineSummary, RunError> {
    let files = discover_files(config)?;
    if files.is_empty() {
        warn!("No log files found for the configured sources");
    }

    let output_dir: &Path = &config.output.directory;
    info!(directory = %output_dir.display(), "Opening output streams");
    let sinks = open_directory(output_dir)?;

    let diagnostics = Diagnostics::new();
    let summary = run_pipeline(
        files,
        sinks,
        PipelineOptions::from(&config.pipeline),
        diagnostics.clone(),
        cancel,
    )
    .await?;

    log_summary(&summary, &diagnostics);
    Ok(summary)
}

fn log_summary(summary: &PipelineSummary, diagnostics: &Diagnostics) {
    let counts = summary.correlation.counts;
    let drain = summary.correlation.drain;
    let problems = diagnostics.counts();

    info!(
        jobs = counts.jobs,
        job_errors = counts.job_errors,
        extract_details = counts.extract_details,
        subscription_details = counts.subscription_details,
        flow_details = counts.flow_details,
        "Records written"
    );
    info!(
        complete = drain.complete,
        invalid_end = drain.invalid_end,
        unknown = drain.unknown,
        requeues = drain.requeues,
        "Job outcomes"
    );
    info!(
        lines = summary.lines.records,
        warnings = problems.warnings,
        unmatched_headers = problems.unmatched_headers,
        "Diagnostics"
    );

    if summary.failed_files > 0 {
        error!(failed_files = summary.failed_files, "Some files could not be read");
    }
    if summary.cancelled {
        warn!("Run was cancelled; unterminated jobs were recorded as unknown");
    }
}
