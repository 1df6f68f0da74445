//! `load_config` module: turns an optional YAML file plus environment overrides into the
//! core [`PipelineConfig`] and the names of the external tools to run.
//!
//! Precedence, lowest first: built-in defaults, YAML file, environment, CLI flags
//! (flags are applied by [`crate::cli`]).
//!
//! Recognised environment variables:
//! - `EE_STATS_REMOTE_ROOT`
//! - `EE_STATS_CONCURRENCY`
//! - `EE_STATS_GCLOUD`
//! - `EE_STATS_GSUTIL`
//!
//! All errors are `anyhow::Error` and surface at the CLI boundary.

use anyhow::{Context, Result};
use ee_stats_core::config::{DownloadFailurePolicy, PipelineConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const ENV_REMOTE_ROOT: &str = "EE_STATS_REMOTE_ROOT";
pub const ENV_CONCURRENCY: &str = "EE_STATS_CONCURRENCY";
pub const ENV_GCLOUD: &str = "EE_STATS_GCLOUD";
pub const ENV_GSUTIL: &str = "EE_STATS_GSUTIL";

/// Names (or paths) of the external programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub gcloud: String,
    pub gsutil: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            gcloud: "gcloud".into(),
            gsutil: "gsutil".into(),
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub pipeline: PipelineConfig,
    pub tools: Tools,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    data_root: Option<PathBuf>,
    #[serde(default)]
    remote: RemoteSection,
    #[serde(default)]
    download: DownloadSection,
    #[serde(default)]
    combine: CombineSection,
    #[serde(default)]
    tools: ToolsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RemoteSection {
    root: Option<String>,
    manifest_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DownloadSection {
    concurrency: Option<usize>,
    retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
    on_failure: Option<DownloadFailurePolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CombineSection {
    file_prefix: Option<String>,
    header_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToolsSection {
    gcloud: Option<String>,
    gsutil: Option<String>,
}

/// Load settings from `path` (if given) and the environment.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let raw = match path {
        Some(path) => read_raw(path)?,
        None => {
            info!("No config file given, using defaults");
            RawConfig::default()
        }
    };

    let mut config = merge(raw);
    apply_env(&mut config)?;

    info!(
        data_root = %config.pipeline.data_root.display(),
        gcloud = %config.tools.gcloud,
        gsutil = %config.tools.gsutil,
        "Config loaded and merged successfully"
    );
    Ok(config)
}

fn read_raw(path: &Path) -> Result<RawConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path,
                e
            ));
        }
    };

    // an empty file deserializes to unit, not to a map
    if content.trim().is_empty() {
        return Ok(RawConfig::default());
    }

    match serde_yaml::from_str(&content) {
        Ok(raw) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            Ok(raw)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

fn merge(raw: RawConfig) -> CliConfig {
    let mut pipeline = PipelineConfig::default();
    let mut tools = Tools::default();

    if let Some(v) = raw.data_root {
        pipeline.data_root = v;
    }
    if let Some(v) = raw.remote.root {
        pipeline.remote_root = v;
    }
    if let Some(v) = raw.remote.manifest_name {
        pipeline.manifest_name = v;
    }
    if let Some(v) = raw.download.concurrency {
        pipeline.concurrency = v;
    }
    if let Some(v) = raw.download.retries {
        pipeline.retries = v;
    }
    if let Some(v) = raw.download.retry_backoff_ms {
        pipeline.retry_backoff_ms = v;
    }
    if let Some(v) = raw.download.on_failure {
        pipeline.on_download_failure = v;
    }
    if let Some(v) = raw.combine.file_prefix {
        pipeline.file_prefix = v;
    }
    if let Some(v) = raw.combine.header_marker {
        pipeline.header_marker = v;
    }
    if let Some(v) = raw.tools.gcloud {
        tools.gcloud = v;
    }
    if let Some(v) = raw.tools.gsutil {
        tools.gsutil = v;
    }

    CliConfig { pipeline, tools }
}

fn apply_env(config: &mut CliConfig) -> Result<()> {
    if let Ok(root) = std::env::var(ENV_REMOTE_ROOT) {
        info!(remote_root = %root, "{ENV_REMOTE_ROOT} found in env");
        config.pipeline.remote_root = root;
    }
    if let Ok(raw) = std::env::var(ENV_CONCURRENCY) {
        config.pipeline.concurrency = raw.trim().parse::<usize>().with_context(|| {
            error!(value = %raw, "{ENV_CONCURRENCY} must be a positive integer");
            format!("{ENV_CONCURRENCY} must be a positive integer, got '{raw}'")
        })?;
    }
    if let Ok(program) = std::env::var(ENV_GCLOUD) {
        config.tools.gcloud = program;
    }
    if let Ok(program) = std::env::var(ENV_GSUTIL) {
        config.tools.gsutil = program;
    }
    Ok(())
}
