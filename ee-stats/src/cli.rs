//! CLI glue for ee-stats: argument parsing, config resolution, progress output and
//! mapping the pipeline result to an exit status.
//!
//! All pipeline logic lives in the `ee-stats-core` crate.

use crate::load_config::{load_config, CliConfig};
use anyhow::Result;
use clap::Parser;
use ee_stats_core::config::{DownloadFailurePolicy, PublisherId};
use ee_stats_core::contract::{DownloadOutcome, DownloadStatus};
use ee_stats_core::errors::PipelineError;
use ee_stats_core::gcloud::{GcloudCli, GsutilCli};
use ee_stats_core::pipeline::run_pipeline;
use std::path::PathBuf;

/// Download, combine and sort Earth Engine statistics for one publisher.
#[derive(Parser, Debug)]
#[clap(
    name = "ee-stats",
    version,
    about = "Download, combine and sort Earth Engine statistics for one publisher"
)]
pub struct Cli {
    /// Publisher identifier, e.g. `usgs`
    pub publisher_id: String,

    /// Path to an optional YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Root directory for downloaded data (default ./data)
    #[clap(long)]
    pub data_dir: Option<PathBuf>,

    /// Maximum number of concurrent downloads
    #[clap(long)]
    pub concurrency: Option<usize>,

    /// Do not run `gcloud auth login`
    #[clap(long)]
    pub skip_login: bool,

    /// Stop before combining if any download failed
    #[clap(long)]
    pub abort_on_failure: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut CliConfig) {
        if let Some(dir) = &self.data_dir {
            config.pipeline.data_root = dir.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.pipeline.concurrency = concurrency;
        }
        if self.skip_login {
            config.pipeline.login = false;
        }
        if self.abort_on_failure {
            config.pipeline.on_download_failure = DownloadFailurePolicy::Abort;
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let publisher = PublisherId::new(&cli.publisher_id)?;
    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.pipeline.trace_loaded();

    let authenticator = GcloudCli::new(config.tools.gcloud.clone());
    let copier = GsutilCli::new(config.tools.gsutil.clone());

    println!("Fetching statistics for {publisher}...");
    let result = run_pipeline(
        &config.pipeline,
        &publisher,
        &authenticator,
        &copier,
        print_progress,
    )
    .await;

    match result {
        Ok(report) => {
            println!(
                "Combined {} files into {}",
                report.combine.file_count,
                report.combine.output.display()
            );
            println!(
                "Downloads: {} downloaded, {} already present, {} failed",
                report.downloads.downloaded(),
                report.downloads.skipped(),
                report.downloads.failed()
            );
            if report.has_failures() {
                for failure in report.downloads.failures() {
                    eprintln!("[WARN] missing from output: {}", failure.locator);
                }
                tracing::warn!(
                    command = "run",
                    failed = report.downloads.failed(),
                    "Completed with download failures"
                );
                anyhow::bail!(
                    "{} of {} downloads failed; {} may be incomplete",
                    report.downloads.failed(),
                    report.downloads.total(),
                    report.combine.output.display()
                );
            }
            tracing::info!(command = "run", ?report, "Pipeline complete");
            Ok(())
        }
        Err(e @ PipelineError::Authentication(_)) => {
            eprintln!("You are not logged in to gcloud. Please run `gcloud auth login`");
            tracing::error!(command = "run", error = %e, "Authentication failed");
            Err(anyhow::Error::new(e))
        }
        Err(e) => {
            eprintln!("[ERROR] Pipeline failed: {}", e);
            tracing::error!(command = "run", error = %e, "Pipeline failed");
            Err(anyhow::Error::new(e))
        }
    }
}

fn print_progress(outcome: &DownloadOutcome) {
    match &outcome.status {
        DownloadStatus::Skipped => println!("{} already exists", outcome.file_name),
        DownloadStatus::Downloaded => println!("Downloaded {}", outcome.locator),
        DownloadStatus::Failed { error } => {
            eprintln!("Error downloading {}: {}", outcome.locator, error)
        }
    }
}
