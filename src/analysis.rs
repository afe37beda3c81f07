//! Analysis adapter around the similarity engine
//!
//! Hands a session's staged directories to a [`SimilarityEngine`], bounds the run with a
//! timeout, and returns the pairwise results ordered by descending similarity.

use crate::engine::{EngineConfig, EngineError, SimilarityEngine};
use crate::model::PairwiseResult;
use crate::staging::StagedDirectory;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Layouts checked, in order, when describing where a submission keeps its sources
const SOURCE_ROOT_CANDIDATES: &[&str] = &["src/main/java", "src", "source", "java"];

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("At least 2 corpus directories are required, got {0}")]
    InsufficientCorpus(usize),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Ordered results of one engine run
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutput {
    pub results: Vec<PairwiseResult>,
    pub bundle: Option<PathBuf>,
}

pub struct AnalysisAdapter {
    engine: Arc<dyn SimilarityEngine>,
    config: EngineConfig,
    timeout: Duration,
}

/// Most specific conventional source root below a staged directory
///
/// Only used for diagnostics; the engine always receives the staged root itself.
pub fn likely_source_root(dir: &Path) -> PathBuf {
    SOURCE_ROOT_CANDIDATES
        .iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_dir())
        .unwrap_or_else(|| dir.to_path_buf())
}

/// Stable sort by descending primary similarity
pub fn sort_by_similarity(results: &mut [PairwiseResult]) {
    results.sort_by(|a, b| b.similarity().total_cmp(&a.similarity()));
}

impl AnalysisAdapter {
    pub fn new(engine: Arc<dyn SimilarityEngine>, config: EngineConfig, timeout: Duration) -> Self {
        Self {
            engine,
            config,
            timeout,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn analyze(
        &self,
        staged: &[StagedDirectory],
        output_dir: &Path,
    ) -> Result<AnalysisOutput, AnalysisError> {
        if staged.len() < 2 {
            return Err(AnalysisError::InsufficientCorpus(staged.len()));
        }

        let corpus: Vec<PathBuf> = staged.iter().map(|s| s.path.clone()).collect();
        for dir in staged {
            debug!(
                submission_id = dir.submission_id,
                source_root = %likely_source_root(&dir.path).display(),
                files = dir.source_file_count,
                "Corpus directory"
            );
        }

        info!(
            engine = self.engine.name(),
            directories = corpus.len(),
            min_tokens = self.config.min_token_match,
            threshold = self.config.similarity_threshold,
            "Running similarity engine"
        );

        let start = Instant::now();
        let run = tokio::time::timeout(
            self.timeout,
            self.engine.run(&corpus, &self.config, output_dir),
        )
        .await
        .map_err(|_| EngineError::Timeout(self.timeout.as_secs()))??;

        let mut results = run.results;
        sort_by_similarity(&mut results);

        info!(
            pairs = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Similarity engine finished"
        );

        Ok(AnalysisOutput {
            results,
            bundle: run.bundle,
        })
    }
}
