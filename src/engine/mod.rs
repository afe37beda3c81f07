//! Similarity engine collaborators
//!
//! The engine is opaque: given a set of local directories it compares every pair and
//! returns per-pair scores plus a packaged report bundle. [`ProcessEngine`] drives an
//! external program; [`MockEngine`] replays canned runs.

mod bundle;
mod mock;
mod process;

pub use bundle::{comparison_json, parse_comparison, read_bundle_results};
pub use mock::{MockEngine, MockRun};
pub use process::ProcessEngine;

use crate::model::PairwiseResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine could not be started: {0}")]
    Launch(String),
    #[error("Engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("Engine produced no report bundle at {0}")]
    MissingBundle(PathBuf),
    #[error("Engine report bundle is unreadable: {0}")]
    Bundle(String),
    #[error("Engine timed out after {0}s")]
    Timeout(u64),
    #[error("Engine error: {0}")]
    Other(String),
}

/// Options handed to the engine for one run
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Minimum token run length for a match to count
    pub min_token_match: u32,
    /// Pairs below this similarity may be omitted; 0 reports everything
    pub similarity_threshold: f64,
    /// `None` means no cap on the number of comparisons
    pub max_comparisons: Option<u32>,
    pub file_suffixes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_token_match: 12,
            similarity_threshold: 0.0,
            max_comparisons: None,
            file_suffixes: vec![".java".to_string()],
        }
    }
}

/// Output of one engine run
#[derive(Debug, Clone, Default)]
pub struct EngineRun {
    pub results: Vec<PairwiseResult>,
    /// Packaged report bundle, if the engine produced one
    pub bundle: Option<PathBuf>,
}

#[async_trait]
pub trait SimilarityEngine: Send + Sync {
    /// Compares every pair of `corpus` directories
    ///
    /// Scratch files and the report bundle go under `output_dir`. The run is
    /// all-or-nothing: an error means no result is usable.
    async fn run(
        &self,
        corpus: &[PathBuf],
        config: &EngineConfig,
        output_dir: &Path,
    ) -> Result<EngineRun, EngineError>;

    fn name(&self) -> &str;
}
