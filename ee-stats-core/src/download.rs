//! Bounded-concurrency download of every file listed in a manifest.
//!
//! Each locator is fetched into its own staging directory inside the data
//! directory and then hard-linked to its final name. Linking fails when the
//! name already exists, which makes "is it there yet?" and "put it there" a
//! single atomic step. Staging directories start with `.` and are removed
//! when the fetch ends, successful or not.
//!
//! Outcomes are handed to the caller in completion order.

use futures::stream::{self, StreamExt};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::contract::{DownloadOutcome, DownloadStatus, DownloadSummary, ObjectCopier};
use crate::errors::CommandError;
use crate::manifest::{Locator, Manifest};

const STAGING_PREFIX: &str = ".ee-stats-partial-";

/// Knobs for [`download_files`].
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Maximum number of copies in flight. Values below 1 are treated as 1.
    pub concurrency: usize,
    /// Extra attempts after the first failure.
    pub retries: u32,
    /// Base delay; attempt `n` waits `retry_backoff * n` before retrying.
    pub retry_backoff: Duration,
}

impl From<&PipelineConfig> for DownloadOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            retries: config.retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

#[derive(Debug, Error)]
enum FetchError {
    #[error(transparent)]
    Copy(#[from] CommandError),
    #[error("cannot create staging directory: {0}")]
    Staging(#[source] io::Error),
    #[error("copy reported success but {} was not written", .0.display())]
    Missing(PathBuf),
    #[error("cannot move downloaded file into place: {0}")]
    Publish(#[source] io::Error),
}

enum Placed {
    New,
    AlreadyPresent,
}

/// Download every locator of `manifest` into `data_dir`.
///
/// `on_complete` is called once per locator, as soon as that locator is done.
/// Failures are reported, never propagated: the returned summary holds exactly
/// one outcome per manifest entry.
pub async fn download_files<C, F>(
    manifest: &Manifest,
    data_dir: &Path,
    copier: &C,
    options: &DownloadOptions,
    mut on_complete: F,
) -> DownloadSummary
where
    C: ObjectCopier + ?Sized,
    F: FnMut(&DownloadOutcome),
{
    let concurrency = options.concurrency.max(1);
    info!(
        locators = manifest.len(),
        concurrency,
        data_dir = %data_dir.display(),
        "[DOWNLOAD] Starting downloads"
    );

    let mut completions = stream::iter(manifest.locators.iter())
        .map(|locator| download_one(locator, data_dir, copier, options))
        .buffer_unordered(concurrency);

    let mut summary = DownloadSummary::default();
    while let Some(outcome) = completions.next().await {
        log_outcome(&outcome);
        on_complete(&outcome);
        summary.outcomes.push(outcome);
    }

    info!(
        total = summary.total(),
        downloaded = summary.downloaded(),
        skipped = summary.skipped(),
        failed = summary.failed(),
        "[DOWNLOAD] Finished downloads"
    );
    summary
}

async fn download_one<C>(
    locator: &Locator,
    data_dir: &Path,
    copier: &C,
    options: &DownloadOptions,
) -> DownloadOutcome
where
    C: ObjectCopier + ?Sized,
{
    let outcome = |file_name: &str, attempts: u32, status: DownloadStatus| DownloadOutcome {
        locator: locator.to_string(),
        file_name: file_name.to_string(),
        attempts,
        status,
    };

    let Some(file_name) = locator.local_name() else {
        return outcome(
            locator.file_name(),
            0,
            DownloadStatus::Failed {
                error: "locator does not name a file".into(),
            },
        );
    };

    if data_dir.join(file_name).exists() {
        return outcome(file_name, 0, DownloadStatus::Skipped);
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        debug!(locator = %locator, attempt, "Downloading");
        match fetch_into_place(locator, file_name, data_dir, copier).await {
            Ok(Placed::New) => return outcome(file_name, attempt, DownloadStatus::Downloaded),
            Ok(Placed::AlreadyPresent) => return outcome(file_name, attempt, DownloadStatus::Skipped),
            Err(e) if attempt <= options.retries => {
                let delay = options.retry_backoff * attempt;
                warn!(
                    locator = %locator,
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Download attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return outcome(
                    file_name,
                    attempt,
                    DownloadStatus::Failed {
                        error: e.to_string(),
                    },
                )
            }
        }
    }
}

async fn fetch_into_place<C>(
    locator: &Locator,
    file_name: &str,
    data_dir: &Path,
    copier: &C,
) -> Result<Placed, FetchError>
where
    C: ObjectCopier + ?Sized,
{
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(data_dir)
        .map_err(FetchError::Staging)?;

    copier.copy(locator.as_str(), staging.path()).await?;

    let staged = staging.path().join(file_name);
    if !staged.is_file() {
        return Err(FetchError::Missing(staged));
    }

    match fs::hard_link(&staged, data_dir.join(file_name)) {
        Ok(()) => Ok(Placed::New),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(Placed::AlreadyPresent),
        Err(e) => Err(FetchError::Publish(e)),
    }
}

fn log_outcome(outcome: &DownloadOutcome) {
    match &outcome.status {
        DownloadStatus::Skipped => {
            info!(file = %outcome.file_name, "{} already exists", outcome.file_name)
        }
        DownloadStatus::Downloaded => info!(
            locator = %outcome.locator,
            attempts = outcome.attempts,
            "Downloaded {}",
            outcome.file_name
        ),
        DownloadStatus::Failed { error } => error!(
            locator = %outcome.locator,
            attempts = outcome.attempts,
            error = %error,
            "Failed to download {}",
            outcome.locator
        ),
    }
}
