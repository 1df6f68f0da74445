//! CLI-backed implementations of the [`crate::contract`] traits.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::contract::{Authenticator, ObjectCopier};
use crate::errors::CommandError;

/// `gcloud auth login`, run interactively.
#[derive(Debug, Clone)]
pub struct GcloudCli {
    program: String,
}

impl GcloudCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GcloudCli {
    fn default() -> Self {
        Self::new("gcloud")
    }
}

#[async_trait]
impl Authenticator for GcloudCli {
    async fn login(&self) -> Result<(), CommandError> {
        info!(program = %self.program, "Running cloud login");
        // stdio is inherited so the operator sees the login prompt
        let status = Command::new(&self.program)
            .arg("auth")
            .arg("login")
            .status()
            .await
            .map_err(|e| {
                error!(error = ?e, program = %self.program, "Failed to launch login command");
                CommandError::Spawn {
                    program: self.program.clone(),
                    source: e,
                }
            })?;

        if status.success() {
            info!(status = ?status, "Login command succeeded");
            Ok(())
        } else {
            error!(program = %self.program, "Login command exited with non-zero code: {}", status);
            Err(CommandError::Failed {
                program: self.program.clone(),
                status: status.to_string(),
                stderr: String::new(),
            })
        }
    }
}

/// `gsutil cp <source> <destination>`
#[derive(Debug, Clone)]
pub struct GsutilCli {
    program: String,
}

impl GsutilCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GsutilCli {
    fn default() -> Self {
        Self::new("gsutil")
    }
}

#[async_trait]
impl ObjectCopier for GsutilCli {
    async fn copy(&self, source: &str, destination: &Path) -> Result<(), CommandError> {
        debug!(source, destination = %destination.display(), "gsutil cp");
        let output = Command::new(&self.program)
            .arg("cp")
            .arg(source)
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CommandError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(CommandError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
