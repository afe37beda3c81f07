//! simcheck - code similarity analysis across repository submissions
//!
//! This library orchestrates a similarity engine over a set of remote code submissions.
//! Each request gets an isolated session: submissions are cloned and filtered into
//! deterministically named directories, the engine compares every pair, engine
//! directory names are mapped back to caller identities, and report artifacts are
//! written where they can be served after the session is gone.
//!
//! # Core Concepts
//!
//! - **Session**: one request's private workspace, removed on every exit path
//! - **Staged directory**: `submission_<id>_team_<team>`, the only identity the engine sees
//! - **Degraded comparison**: a result whose identities were recovered by a fallback
//!   heuristic instead of an exact directory name match
//!
//! # Example Usage
//!
//! ```ignore
//! use simcheck::{AnalysisRequest, DetectionService, SimcheckConfig};
//!
//! async fn analyze(request: AnalysisRequest) {
//!     let service = DetectionService::from_config(SimcheckConfig::default());
//!     let response = service.detect(&request).await;
//!     println!("{} comparisons", response.comparisons.len());
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`workspace`]: session lifecycle and cleanup
//! - [`staging`]: URL validation, cloning and source filtering
//! - [`analysis`] and [`engine`]: running the similarity engine
//! - [`identity`]: mapping directory names back to submissions
//! - [`report`]: bundle extraction, comparison documents and report lookups
//! - [`stats`]: summary figures
//! - [`pipeline`]: the request-level service

pub mod analysis;
pub mod cli;
pub mod config;
pub mod engine;
pub mod identity;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod staging;
pub mod stats;
pub mod util;
pub mod workspace;

// Re-export key types for convenient access
pub use analysis::{AnalysisAdapter, AnalysisError, AnalysisOutput};
pub use config::{ConfigError, SimcheckConfig};
pub use engine::{EngineConfig, EngineError, MockEngine, ProcessEngine, SimilarityEngine};
pub use identity::{IdentityResolver, Resolution, ResolvedIdentity};
pub use model::{
    AnalysisRequest, AnalysisResponse, ComparisonResult, ComparisonStatus, PairwiseResult,
    Statistics, Submission,
};
pub use pipeline::{DetectionService, PipelineError, ValidationError};
pub use report::{ExtractionError, ReportError, ReportStore};
pub use staging::{GitCloner, RepositoryCloner, RepositoryStager, StagingError};
pub use util::{init_logging, LoggingConfig};
pub use workspace::{Session, Workspace, WorkspaceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
