//! Repository staging
//!
//! Turns each caller submission into a local directory the engine can read:
//! the URL is checked against an allow-list, the repository is cloned into the
//! session's `clones/` area, and only source files are copied into `corpus/` under a
//! name that encodes the submission identity (`submission_<id>_team_<team>`).

mod cloner;
mod copy;
mod url;

pub use cloner::{GitCloner, RepositoryCloner};
pub use copy::{copy_source_tree, has_source_suffix, CopyStats, EXCLUDED_DIRS};
pub use url::validate_repository_url;

use crate::model::Submission;
use crate::workspace::Session;
use futures_util::stream::{self, StreamExt};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Target path already exists: {0}")]
    TargetExists(PathBuf),
    #[error("Failed to clone {url}: {message}")]
    CloneFailed { url: String, message: String },
    #[error("Clone of {url} timed out after {secs}s")]
    CloneTimeout { url: String, secs: u64 },
    #[error("Failed to copy sources into {path}: {source}")]
    Copy { path: PathBuf, source: io::Error },
    #[error("Staging task failed: {0}")]
    TaskFailed(String),
}

/// Directory name encoding a submission's identity
pub fn staged_dir_name(submission_id: i64, team_id: i64) -> String {
    format!("submission_{}_team_{}", submission_id, team_id)
}

/// A submission's filtered source tree inside a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDirectory {
    pub submission_id: i64,
    pub team_id: i64,
    pub name: String,
    /// Filtered copy handed to the engine
    pub path: PathBuf,
    /// Raw clone, kept until the session is torn down
    pub clone_dir: PathBuf,
    pub source_file_count: usize,
}

impl StagedDirectory {
    /// True when no qualifying source files were found
    pub fn is_empty(&self) -> bool {
        self.source_file_count == 0
    }
}

/// A submission that could not be staged
#[derive(Debug)]
pub struct StagingFailure {
    pub submission_id: i64,
    pub team_id: i64,
    pub error: StagingError,
}

/// Per-submission results of staging a batch, in request order
#[derive(Debug, Default)]
pub struct StagingOutcome {
    pub staged: Vec<StagedDirectory>,
    pub failures: Vec<StagingFailure>,
}

impl StagingOutcome {
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    pub fn empty_count(&self) -> usize {
        self.staged.iter().filter(|s| s.is_empty()).count()
    }
}

/// Stages submissions into a session
pub struct RepositoryStager {
    cloner: Arc<dyn RepositoryCloner>,
    suffixes: Vec<String>,
    concurrency: usize,
}

impl RepositoryStager {
    pub fn new(cloner: Arc<dyn RepositoryCloner>, suffixes: Vec<String>) -> Self {
        Self {
            cloner,
            suffixes,
            concurrency: 4,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Stages one submission
    ///
    /// Nothing is fetched when the URL fails validation. An existing clone or corpus
    /// directory for the same identity is never overwritten.
    pub async fn stage(
        &self,
        submission: &Submission,
        session: &Session,
    ) -> Result<StagedDirectory, StagingError> {
        validate_repository_url(&submission.repository_url)?;

        let name = staged_dir_name(submission.submission_id, submission.team_id);
        let clone_dir = session.clones_dir().join(&name);
        let corpus_dir = session.corpus_dir().join(&name);

        if clone_dir.exists() {
            return Err(StagingError::TargetExists(clone_dir));
        }
        if corpus_dir.exists() {
            return Err(StagingError::TargetExists(corpus_dir));
        }

        self.cloner
            .clone_repository(&submission.repository_url, &clone_dir)
            .await?;

        let stats = {
            let source = clone_dir.clone();
            let target = corpus_dir.clone();
            let suffixes = self.suffixes.clone();
            tokio::task::spawn_blocking(move || copy_source_tree(&source, &target, &suffixes))
                .await
                .map_err(|e| StagingError::TaskFailed(e.to_string()))??
        };

        if stats.files_copied == 0 {
            warn!(
                submission_id = submission.submission_id,
                team_id = submission.team_id,
                suffixes = ?self.suffixes,
                "No source files found in repository; staging empty directory"
            );
        } else {
            debug!(
                submission_id = submission.submission_id,
                files = stats.files_copied,
                skipped = stats.files_skipped,
                "Submission staged"
            );
        }

        Ok(StagedDirectory {
            submission_id: submission.submission_id,
            team_id: submission.team_id,
            name,
            path: corpus_dir,
            clone_dir,
            source_file_count: stats.files_copied,
        })
    }

    /// Stages every submission, at most `concurrency` at a time
    ///
    /// A failure never stops the batch; results come back in request order.
    pub async fn stage_all(&self, submissions: &[Submission], session: &Session) -> StagingOutcome {
        let results: Vec<_> = stream::iter(submissions)
            .map(|submission| async move { (submission, self.stage(submission, session).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut outcome = StagingOutcome::default();
        for (submission, result) in results {
            match result {
                Ok(staged) => outcome.staged.push(staged),
                Err(error) => {
                    warn!(
                        session_id = %session.id(),
                        submission_id = submission.submission_id,
                        error = %error,
                        "Failed to stage submission"
                    );
                    outcome.failures.push(StagingFailure {
                        submission_id: submission.submission_id,
                        team_id: submission.team_id,
                        error,
                    });
                }
            }
        }

        info!(
            session_id = %session.id(),
            staged = outcome.staged_count(),
            failed = outcome.failures.len(),
            empty = outcome.empty_count(),
            "Staging complete"
        );
        outcome
    }
}
