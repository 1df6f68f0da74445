//! High-level pipeline: login → manifest → downloads → combine → normalize.
//!
//! Every step runs to completion before the next one starts. Only the
//! download step does work concurrently (see [`crate::download`]).
//!
//! # Error Handling
//! Login, manifest and filesystem failures stop the run with a
//! [`PipelineError`]. Individual download failures do not; they are collected
//! in the report and handled according to
//! [`DownloadFailurePolicy`](crate::config::DownloadFailurePolicy).

use tracing::{debug, error, info, warn};

use crate::auth::authenticate;
use crate::combine::combine_files;
use crate::config::{DownloadFailurePolicy, PipelineConfig, PublisherId};
use crate::contract::{Authenticator, DownloadOutcome, ObjectCopier, PipelineReport};
use crate::download::{download_files, DownloadOptions};
use crate::errors::PipelineError;
use crate::manifest::{fetch_manifest, Manifest};
use crate::normalize::normalize_and_sort;

pub async fn run_pipeline<A, C, F>(
    config: &PipelineConfig,
    publisher: &PublisherId,
    authenticator: &A,
    copier: &C,
    on_download: F,
) -> Result<PipelineReport, PipelineError>
where
    A: Authenticator + ?Sized,
    C: ObjectCopier + ?Sized,
    F: FnMut(&DownloadOutcome),
{
    config.validate()?;
    info!(publisher = %publisher, "[PIPELINE] Starting");

    // Step 1: login
    if config.login {
        authenticate(authenticator).await?;
    } else {
        info!("[PIPELINE] Login skipped by configuration");
    }

    // Step 2: manifest
    let manifest_path = fetch_manifest(config, publisher, copier).await?;
    let manifest = Manifest::read(&manifest_path)?;

    // Step 3: downloads
    let data_dir = config.data_dir(publisher);
    let downloads = download_files(
        &manifest,
        &data_dir,
        copier,
        &DownloadOptions::from(config),
        on_download,
    )
    .await;
    match serde_json::to_string_pretty(&downloads) {
        Ok(json) => debug!(json = %json, "[PIPELINE][DEBUG] Download summary as JSON"),
        Err(e) => error!(error = ?e, "[PIPELINE][DEBUG] Failed to serialize download summary"),
    }

    let failed = downloads.failed();
    if failed > 0 {
        match config.on_download_failure {
            DownloadFailurePolicy::Abort => {
                error!(failed, total = downloads.total(), "[PIPELINE][ERROR] Downloads failed, aborting before combine");
                return Err(PipelineError::DownloadsFailed {
                    failed,
                    total: downloads.total(),
                });
            }
            DownloadFailurePolicy::Continue => warn!(
                failed,
                total = downloads.total(),
                "[PIPELINE] Some downloads failed, combining the files that arrived"
            ),
        }
    }

    // Step 4: combine
    let combined_path = config.combined_path(publisher);
    let combine = combine_files(
        &data_dir,
        &combined_path,
        &config.file_prefix,
        &config.header_marker,
    )?;

    // Step 5: normalize and sort
    let normalize = normalize_and_sort(&combined_path)?;

    info!(
        publisher = %publisher,
        files = combine.file_count,
        rows = normalize.rows,
        output = %combined_path.display(),
        "[PIPELINE] Complete"
    );

    Ok(PipelineReport {
        publisher: publisher.to_string(),
        downloads,
        combine,
        normalize,
    })
}
