use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of an external command (`gcloud`, `gsutil`).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {status}{}", stderr_suffix(.stderr))]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Errors that stop the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid publisher id '{0}': {1}")]
    InvalidPublisher(String, &'static str),
    #[error("configuration error: {0}")]
    InvalidConfig(String),
    #[error("authentication failed: {0}")]
    Authentication(#[source] CommandError),
    #[error("cannot prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to fetch manifest {remote}: {reason}")]
    ManifestFetch { remote: String, reason: String },
    #[error("failed to read manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{failed} of {total} downloads failed")]
    DownloadsFailed { failed: usize, total: usize },
    #[error("failed to combine files into {path}: {source}")]
    Combine {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to normalize {path}: {source}")]
    Normalize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_command_without_stderr_has_no_trailing_separator() {
        let err = CommandError::Failed {
            program: "gcloud".into(),
            status: "exit status: 1".into(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "`gcloud` exited with exit status: 1");
    }

    #[test]
    fn failed_command_message_carries_stderr() {
        let err = CommandError::Failed {
            program: "gsutil".into(),
            status: "exit status: 1".into(),
            stderr: "CommandException: No URLs matched".into(),
        };
        assert_eq!(
            err.to_string(),
            "`gsutil` exited with exit status: 1: CommandException: No URLs matched"
        );
    }
}
