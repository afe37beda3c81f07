use super::bundle::comparison_json;
use super::{EngineConfig, EngineError, EngineRun, SimilarityEngine};
use crate::model::PairwiseResult;
use crate::report::write_tar_gz;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A canned engine outcome
#[derive(Debug)]
pub struct MockRun {
    pub results: Vec<PairwiseResult>,
    /// Files written into a `report.tar.gz` bundle in the output directory
    pub bundle_files: Option<Vec<(String, Vec<u8>)>>,
    pub error: Option<EngineError>,
}

impl MockRun {
    /// Results without a report bundle
    pub fn results(results: Vec<PairwiseResult>) -> Self {
        Self {
            results,
            bundle_files: None,
            error: None,
        }
    }

    /// Results plus a minimal bundle holding an entry point and one JSON file per pair
    pub fn with_bundle(results: Vec<PairwiseResult>) -> Self {
        let mut files = vec![(
            "index.html".to_string(),
            b"<html><head><link href=\"style.css\"></head><body></body></html>".to_vec(),
        )];
        for (i, result) in results.iter().enumerate() {
            files.push((
                format!("comparisons/{}.json", i),
                comparison_json(result).to_string().into_bytes(),
            ));
        }
        Self {
            results,
            bundle_files: Some(files),
            error: None,
        }
    }

    /// Results plus an explicit bundle layout
    pub fn with_bundle_files(
        results: Vec<PairwiseResult>,
        files: Vec<(String, Vec<u8>)>,
    ) -> Self {
        Self {
            results,
            bundle_files: Some(files),
            error: None,
        }
    }

    pub fn error(error: EngineError) -> Self {
        Self {
            results: Vec::new(),
            bundle_files: None,
            error: Some(error),
        }
    }
}

/// Engine double that replays queued runs and records what it was asked
pub struct MockEngine {
    runs: Mutex<VecDeque<MockRun>>,
    calls: Mutex<Vec<(Vec<PathBuf>, EngineConfig)>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn add_run(&self, run: MockRun) {
        self.runs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(run);
    }

    pub fn remaining_runs(&self) -> usize {
        self.runs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Corpus and configuration of every call so far
    pub fn calls(&self) -> Vec<(Vec<PathBuf>, EngineConfig)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimilarityEngine for MockEngine {
    async fn run(
        &self,
        corpus: &[PathBuf],
        config: &EngineConfig,
        output_dir: &Path,
    ) -> Result<EngineRun, EngineError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((corpus.to_vec(), config.clone()));

        let run = self
            .runs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| EngineError::Other("MockEngine: no more runs in queue".to_string()))?;

        if let Some(error) = run.error {
            return Err(error);
        }

        let bundle = match run.bundle_files {
            Some(files) => {
                let path = output_dir.join("report.tar.gz");
                write_tar_gz(&path, &files).map_err(|e| EngineError::Bundle(e.to_string()))?;
                Some(path)
            }
            None => None,
        };

        Ok(EngineRun {
            results: run.results,
            bundle,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
