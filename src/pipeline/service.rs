use super::validate::{validate_request, ValidationError};
use crate::analysis::{AnalysisAdapter, AnalysisError};
use crate::config::SimcheckConfig;
use crate::engine::{ProcessEngine, SimilarityEngine};
use crate::identity::IdentityResolver;
use crate::model::{
    AnalysisRequest, AnalysisResponse, ComparisonResult, ComparisonStatus,
};
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::report::{
    comparison_url, extract_bundle, open_bundle, viewer_url, ComparisonRenderer,
    ExtractionError,
};
use crate::staging::{GitCloner, RepositoryCloner, RepositoryStager};
use crate::stats::summarize;
use crate::workspace::{remove_tree, Workspace, WorkspaceError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

pub const SUCCESS_MESSAGE: &str = "Plagiarism analysis completed successfully";
pub const INSUFFICIENT_MESSAGE: &str = "Insufficient valid submissions";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("Insufficient valid submissions: {staged} staged")]
    InsufficientSubmissions { staged: usize },
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl PipelineError {
    /// Message placed in the failed response
    pub fn response_message(&self) -> String {
        match self {
            PipelineError::Validation(e) => e.to_string(),
            PipelineError::InsufficientSubmissions { .. } => INSUFFICIENT_MESSAGE.to_string(),
            other => format!("Error during plagiarism analysis: {}", other),
        }
    }
}

/// Runs one analysis request end to end
///
/// Every request gets its own session directory, which is removed before `detect`
/// returns no matter how the request ends. Report artifacts are written outside the
/// session and outlive it.
pub struct DetectionService {
    config: SimcheckConfig,
    workspace: Workspace,
    stager: RepositoryStager,
    adapter: AnalysisAdapter,
    renderer: ComparisonRenderer,
    progress: Arc<dyn ProgressHandler>,
}

impl DetectionService {
    pub fn new(
        config: SimcheckConfig,
        cloner: Arc<dyn RepositoryCloner>,
        engine: Arc<dyn SimilarityEngine>,
    ) -> Self {
        let workspace = Workspace::new(config.temp_dir.clone());
        let stager = RepositoryStager::new(cloner, config.file_suffixes.clone())
            .with_concurrency(config.staging_concurrency);
        let adapter = AnalysisAdapter::new(engine, config.engine_config(), config.engine_timeout());
        let renderer = ComparisonRenderer::new(config.comparisons_dir.clone())
            .with_max_matches(config.max_matches_per_document);

        Self {
            config,
            workspace,
            stager,
            adapter,
            renderer,
            progress: Arc::new(NoOpHandler),
        }
    }

    /// Service backed by `git` and the configured engine program
    pub fn from_config(config: SimcheckConfig) -> Self {
        let cloner = Arc::new(GitCloner::new(config.clone_timeout()));
        let engine = Arc::new(ProcessEngine::new(
            config.engine_command.clone(),
            config.engine_args.clone(),
        ));
        Self::new(config, cloner, engine)
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress = handler;
        self
    }

    pub fn config(&self) -> &SimcheckConfig {
        &self.config
    }

    /// Analyzes a request; failures are reported in the response, never returned
    pub async fn detect(&self, request: &AnalysisRequest) -> AnalysisResponse {
        let start = Instant::now();
        info!(
            assignment_id = request.assignment_id,
            submissions = request.submissions.len(),
            "Analysis requested"
        );

        match self.run(request, start).await {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    PipelineError::Validation(_) | PipelineError::InsufficientSubmissions { .. } => {
                        warn!(assignment_id = request.assignment_id, error = %e, "Analysis rejected")
                    }
                    _ => error!(assignment_id = request.assignment_id, error = %e, "Analysis failed"),
                }
                self.progress.on_progress(&ProgressEvent::Failed {
                    error: e.to_string(),
                });
                AnalysisResponse::failure(request, e.response_message())
            }
        }
    }

    async fn run(
        &self,
        request: &AnalysisRequest,
        start: Instant,
    ) -> Result<AnalysisResponse, PipelineError> {
        validate_request(request, self.config.max_submissions)?;

        let mut session = self.workspace.open_session()?;
        let session_id = session.id().to_string();
        self.progress.on_progress(&ProgressEvent::SessionOpened {
            session_id: session_id.clone(),
            submissions: request.submissions.len(),
        });

        let outcome = self.stager.stage_all(&request.submissions, &session).await;
        for failure in &outcome.failures {
            self.progress.on_progress(&ProgressEvent::SubmissionFailed {
                submission_id: failure.submission_id,
                error: failure.error.to_string(),
            });
        }
        for staged in &outcome.staged {
            session.record_staged(staged.submission_id, staged.path.clone());
            self.progress.on_progress(&ProgressEvent::SubmissionStaged {
                submission_id: staged.submission_id,
                source_files: staged.source_file_count,
            });
        }

        if outcome.staged_count() < 2 {
            return Err(PipelineError::InsufficientSubmissions {
                staged: outcome.staged_count(),
            });
        }

        self.progress.on_progress(&ProgressEvent::EngineStarted {
            directories: outcome.staged_count(),
        });
        let engine_start = Instant::now();
        let output = self
            .adapter
            .analyze(&outcome.staged, &session.engine_dir())
            .await?;
        self.progress.on_progress(&ProgressEvent::EngineCompleted {
            pairs: output.results.len(),
            duration: engine_start.elapsed(),
        });

        let resolver = IdentityResolver::new(&request.submissions);
        let resolved: Vec<_> = output
            .results
            .iter()
            .filter_map(|pair| {
                resolver
                    .resolve_pair(pair)
                    .map(|(first, second)| (pair, first, second))
            })
            .collect();

        let bundle_extracted = self.materialize_bundle(&session_id, output.bundle).await;
        let rendered = self.renderer.render_all(
            &session_id,
            resolved
                .iter()
                .map(|(pair, first, second)| (*pair, first, second)),
        );

        let base_url = &self.config.public_base_url;
        let mut documents = 0;
        let comparisons: Vec<ComparisonResult> = resolved
            .iter()
            .zip(rendered)
            .map(|((pair, first, second), document)| {
                let status = if first.is_degraded() || second.is_degraded() {
                    ComparisonStatus::Degraded
                } else {
                    ComparisonStatus::Completed
                };
                let comparison_artifact_url = document.ok().map(|doc| {
                    documents += 1;
                    comparison_url(base_url, &session_id, &doc.file_name)
                });
                ComparisonResult {
                    submission_id1: first.submission_id,
                    submission_id2: second.submission_id,
                    submission1: pair.first_dir.clone(),
                    submission2: pair.second_dir.clone(),
                    team_name1: first.team_name.clone(),
                    team_name2: second.team_name.clone(),
                    similarity: pair.similarity(),
                    matched_tokens: pair.matched_token_count,
                    status,
                    comparison_artifact_url,
                }
            })
            .collect();

        self.progress.on_progress(&ProgressEvent::ReportMaterialized {
            session_id: session_id.clone(),
            bundle_extracted,
            documents,
        });

        let statistics = summarize(&comparisons, request.submissions.len());
        let cleanup = session.close();
        if cleanup.failed > 0 {
            warn!(
                session_id = %session_id,
                failed = cleanup.failed,
                "Session directory was not fully removed"
            );
        }

        let response = AnalysisResponse {
            assignment_id: request.assignment_id,
            assignment_title: request.assignment_title.clone(),
            session_id: Some(session_id.clone()),
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            comparisons,
            statistics: Some(statistics),
            report_url: bundle_extracted.then(|| viewer_url(base_url, &session_id)),
        };

        self.progress.on_progress(&ProgressEvent::Completed {
            comparisons: response.comparisons.len(),
            degraded: response.degraded_count(),
            total_time: start.elapsed(),
        });
        Ok(response)
    }

    /// Unpacks the engine bundle into `<reportsDir>/<sessionId>`
    ///
    /// Returns false when there is nothing usable to serve; a partially extracted tree
    /// is removed.
    async fn materialize_bundle(&self, session_id: &str, bundle: Option<PathBuf>) -> bool {
        let Some(bundle) = bundle else {
            warn!(session_id, "Engine produced no report bundle");
            return false;
        };

        let destination = self.config.reports_dir.join(session_id);
        let target = destination.clone();
        let result = tokio::task::spawn_blocking(move || -> Result<_, ExtractionError> {
            let mut archive = open_bundle(&bundle)?;
            extract_bundle(archive.as_mut(), &target)
        })
        .await;

        match result {
            Ok(Ok(summary)) => {
                info!(
                    session_id,
                    files = summary.files,
                    bytes = summary.bytes,
                    "Report bundle materialized"
                );
                true
            }
            Ok(Err(e)) => {
                if e.is_security_violation() {
                    warn!(session_id, error = %e, "Rejected unsafe report bundle");
                } else {
                    warn!(session_id, error = %e, "Failed to extract report bundle");
                }
                remove_tree(&destination);
                false
            }
            Err(e) => {
                warn!(session_id, error = %e, "Report extraction task failed");
                remove_tree(&destination);
                false
            }
        }
    }
}
