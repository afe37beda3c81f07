//! Repository transfer collaborators

use super::StagingError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Fetches a repository into a local directory
///
/// Implementations must refuse to write into a path that already exists.
#[async_trait]
pub trait RepositoryCloner: Send + Sync {
    async fn clone_repository(&self, url: &str, target: &Path) -> Result<(), StagingError>;

    fn name(&self) -> &str;
}

/// Clones with the `git` command line client
#[derive(Debug, Clone)]
pub struct GitCloner {
    program: String,
    timeout: Duration,
}

impl GitCloner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "git".to_string(),
            timeout,
        }
    }

    /// Uses a different git executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl RepositoryCloner for GitCloner {
    async fn clone_repository(&self, url: &str, target: &Path) -> Result<(), StagingError> {
        if target.exists() {
            return Err(StagingError::TargetExists(target.to_path_buf()));
        }

        debug!(url, target = %target.display(), "Cloning repository");

        let mut command = Command::new(&self.program);
        command
            .args(["clone", "--depth", "1", "--quiet", "--", url.trim()])
            .arg(target)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|e| StagingError::CloneFailed {
                url: url.to_string(),
                message: format!("failed to start {}: {}", self.program, e),
            })?,
            Err(_) => {
                return Err(StagingError::CloneTimeout {
                    url: url.to_string(),
                    secs: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StagingError::CloneFailed {
                url: url.to_string(),
                message: format!("{} ({})", stderr.trim(), output.status),
            });
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "git"
    }
}
