//! # contract: seams to the outside world and the records passed between steps
//!
//! The pipeline never spawns processes directly. It talks to two traits:
//! - [`Authenticator`]: logs the operator in to the cloud provider.
//! - [`ObjectCopier`]: copies one remote object to the local filesystem.
//!
//! Production implementations live in [`crate::gcloud`]. Both traits are
//! annotated for `mockall`, so tests get `MockAuthenticator` and
//! `MockObjectCopier` (exported with the default `test-export-mocks` feature).
//!
//! The remaining types are plain data describing what each step did.

use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::errors::CommandError;

/// Runs the provider's login flow.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Block until the login command finishes. `Err` means the operator is not logged in.
    async fn login(&self) -> Result<(), CommandError>;
}

/// Copies a single remote object.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectCopier: Send + Sync {
    /// Copy `source` to `destination`.
    ///
    /// `destination` is either a file path (the object is written there) or an
    /// existing directory (the object keeps its remote file name inside it).
    async fn copy(&self, source: &str, destination: &Path) -> Result<(), CommandError>;
}

/// How a single manifest entry ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadStatus {
    /// The file was already in the data directory.
    Skipped,
    Downloaded,
    Failed { error: String },
}

/// Completion report for one locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadOutcome {
    pub locator: String,
    pub file_name: String,
    pub attempts: u32,
    #[serde(flatten)]
    pub status: DownloadStatus,
}

impl DownloadOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, DownloadStatus::Failed { .. })
    }
}

/// All download outcomes, in the order they completed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadSummary {
    pub outcomes: Vec<DownloadOutcome>,
}

impl DownloadSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, DownloadStatus::Skipped))
    }

    pub fn downloaded(&self) -> usize {
        self.count(|s| matches!(s, DownloadStatus::Downloaded))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DownloadStatus::Failed { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    fn count(&self, pred: impl Fn(&DownloadStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Result of concatenating the downloaded files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombineReport {
    pub file_count: usize,
    pub output: PathBuf,
}

/// Result of rewriting and sorting the combined file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub rows: usize,
    pub output: PathBuf,
}

/// Everything a full run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub publisher: String,
    pub downloads: DownloadSummary,
    pub combine: CombineReport,
    pub normalize: NormalizeReport,
}

impl PipelineReport {
    pub fn has_failures(&self) -> bool {
        self.downloads.failed() > 0
    }
}
