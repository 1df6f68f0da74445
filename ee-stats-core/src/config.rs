use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::errors::PipelineError;

pub const DEFAULT_DATA_ROOT: &str = "./data";
pub const DEFAULT_REMOTE_ROOT: &str = "gs://earthengine-stats/providers";
pub const DEFAULT_MANIFEST_NAME: &str = "index.txt";
pub const DEFAULT_FILE_PREFIX: &str = "earthengine_stats";
pub const DEFAULT_HEADER_MARKER: &str = "Interval";
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Identifier of the data publisher; names both the local data directory and
/// the remote manifest folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublisherId(String);

impl PublisherId {
    pub fn new(raw: &str) -> Result<Self, PipelineError> {
        let id = raw.trim();
        let reason = if id.is_empty() {
            Some("must not be empty")
        } else if id == "." || id == ".." {
            Some("must not be a relative directory name")
        } else if id.contains('/') || id.contains('\\') {
            Some("must not contain path separators")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(PipelineError::InvalidPublisher(raw.to_string(), reason)),
            None => Ok(Self(id.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublisherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to do with the combine/normalize steps when some downloads failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFailurePolicy {
    /// Combine whatever arrived and report the failures afterwards.
    #[default]
    Continue,
    /// Stop before combining.
    Abort,
}

/// Pipeline settings. Defaults reproduce the stock Earth Engine stats layout.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_root: PathBuf,
    pub remote_root: String,
    pub manifest_name: String,
    pub file_prefix: String,
    pub header_marker: String,
    pub concurrency: usize,
    pub retries: u32,
    pub retry_backoff_ms: u64,
    pub on_download_failure: DownloadFailurePolicy,
    pub login: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
            remote_root: DEFAULT_REMOTE_ROOT.to_string(),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            header_marker: DEFAULT_HEADER_MARKER.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            retries: DEFAULT_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            on_download_failure: DownloadFailurePolicy::Continue,
            login: true,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.concurrency == 0 {
            return Err(PipelineError::InvalidConfig(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.file_prefix.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "file_prefix must not be empty".into(),
            ));
        }
        if self.manifest_name.is_empty() || self.manifest_name.contains('/') {
            return Err(PipelineError::InvalidConfig(format!(
                "manifest_name '{}' must be a plain file name",
                self.manifest_name
            )));
        }
        Ok(())
    }

    /// `<data_root>/<publisher>`
    pub fn data_dir(&self, publisher: &PublisherId) -> PathBuf {
        self.data_root.join(publisher.as_str())
    }

    /// `<data_root>/<publisher>/<manifest_name>`
    pub fn manifest_path(&self, publisher: &PublisherId) -> PathBuf {
        self.data_dir(publisher).join(&self.manifest_name)
    }

    /// `<data_root>/<publisher>-combined.csv`
    pub fn combined_path(&self, publisher: &PublisherId) -> PathBuf {
        self.data_root.join(format!("{publisher}-combined.csv"))
    }

    /// `<remote_root>/<publisher>/<manifest_name>`
    pub fn remote_manifest(&self, publisher: &PublisherId) -> String {
        format!(
            "{}/{}/{}",
            self.remote_root.trim_end_matches('/'),
            publisher,
            self.manifest_name
        )
    }

    pub fn trace_loaded(&self) {
        info!(
            data_root = %self.data_root.display(),
            remote_root = %self.remote_root,
            concurrency = self.concurrency,
            retries = self.retries,
            on_download_failure = ?self.on_download_failure,
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn publisher_id_is_trimmed() {
        let id = PublisherId::new("  nasa \n").unwrap();
        assert_eq!(id.as_str(), "nasa");
    }

    #[test]
    fn publisher_id_rejects_empty_and_path_like_values() {
        for raw in ["", "   ", ".", "..", "a/b", "a\\b"] {
            assert!(
                PublisherId::new(raw).is_err(),
                "'{raw}' should be rejected"
            );
        }
    }

    #[test]
    fn derived_paths_follow_the_data_layout() {
        let config = PipelineConfig::default();
        let id = PublisherId::new("usgs").unwrap();
        assert_eq!(config.data_dir(&id), Path::new("./data/usgs"));
        assert_eq!(config.manifest_path(&id), Path::new("./data/usgs/index.txt"));
        assert_eq!(
            config.combined_path(&id),
            Path::new("./data/usgs-combined.csv")
        );
        assert_eq!(
            config.remote_manifest(&id),
            "gs://earthengine-stats/providers/usgs/index.txt"
        );
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = PipelineConfig {
            concurrency: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
