//! The manifest: a plain-text list of remote object locators, one per line.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::config::{PipelineConfig, PublisherId};
use crate::contract::ObjectCopier;
use crate::errors::PipelineError;

/// A remote object path such as `gs://bucket/dir/earthengine_stats_2024.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text after the last `/`.
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// The derived file name, if it can safely name a file in the data directory.
    pub fn local_name(&self) -> Option<&str> {
        match self.file_name() {
            "" | "." | ".." => None,
            name if name.contains('\\') => None,
            name => Some(name),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub locators: Vec<Locator>,
}

impl Manifest {
    /// Trim every line and drop blank ones. Order is preserved.
    pub fn parse(content: &str) -> Self {
        let locators = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Locator::new)
            .collect();
        Self { locators }
    }

    pub fn read(path: &Path) -> Result<Self, PipelineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            error!(error = ?e, path = %path.display(), "Failed to read manifest");
            PipelineError::ManifestRead {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
        let manifest = Self::parse(&content);
        info!(
            path = %path.display(),
            locators = manifest.len(),
            "Read manifest"
        );
        Ok(manifest)
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

/// Create the publisher's data directory and copy the remote manifest into it.
///
/// Any earlier local copy is removed first, so a copy that "succeeds" without
/// producing the file is detected instead of silently reusing stale content.
pub async fn fetch_manifest<C>(
    config: &PipelineConfig,
    publisher: &PublisherId,
    copier: &C,
) -> Result<PathBuf, PipelineError>
where
    C: ObjectCopier + ?Sized,
{
    let data_dir = config.data_dir(publisher);
    fs::create_dir_all(&data_dir).map_err(|e| {
        error!(error = ?e, path = %data_dir.display(), "Failed to create data directory");
        PipelineError::DataDir {
            path: data_dir.clone(),
            source: e,
        }
    })?;
    debug!(path = %data_dir.display(), "Data directory ready");

    let local = config.manifest_path(publisher);
    let remote = config.remote_manifest(publisher);

    if local.exists() {
        fs::remove_file(&local).map_err(|e| {
            error!(error = ?e, path = %local.display(), "Failed to remove previous manifest");
            PipelineError::DataDir {
                path: local.clone(),
                source: e,
            }
        })?;
        debug!(path = %local.display(), "Removed previous manifest copy");
    }

    info!(remote = %remote, local = %local.display(), "Fetching manifest");
    if let Err(e) = copier.copy(&remote, &local).await {
        error!(error = %e, remote = %remote, "Manifest copy failed");
        return Err(PipelineError::ManifestFetch {
            remote,
            reason: e.to_string(),
        });
    }

    if !local.is_file() {
        error!(remote = %remote, local = %local.display(), "Manifest copy reported success but no file was written");
        return Err(PipelineError::ManifestFetch {
            remote,
            reason: format!("{} was not created", local.display()),
        });
    }

    info!(local = %local.display(), "Manifest fetched");
    Ok(local)
}
