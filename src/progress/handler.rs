//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while an analysis request runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Session directory created
    SessionOpened {
        session_id: String,
        submissions: usize,
    },

    /// One submission is ready for the engine
    SubmissionStaged {
        submission_id: i64,
        source_files: usize,
    },

    /// One submission could not be staged
    SubmissionFailed { submission_id: i64, error: String },

    /// Engine invoked on the staged corpus
    EngineStarted { directories: usize },

    /// Engine returned pairwise results
    EngineCompleted { pairs: usize, duration: Duration },

    /// Bundle extracted and comparison documents written
    ReportMaterialized {
        session_id: String,
        bundle_extracted: bool,
        documents: usize,
    },

    /// Request finished successfully
    Completed {
        comparisons: usize,
        degraded: usize,
        total_time: Duration,
    },

    /// Request failed
    Failed { error: String },
}

/// Trait for handling progress events
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
