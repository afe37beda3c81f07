//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::SessionOpened {
                session_id,
                submissions,
            } => {
                info!(session_id = %session_id, submissions, "Session opened");
            }
            ProgressEvent::SubmissionStaged {
                submission_id,
                source_files,
            } => {
                if *source_files == 0 {
                    warn!(submission_id, "Submission staged without source files");
                } else {
                    debug!(submission_id, source_files, "Submission staged");
                }
            }
            ProgressEvent::SubmissionFailed {
                submission_id,
                error,
            } => {
                warn!(submission_id, error = %error, "Submission could not be staged");
            }
            ProgressEvent::EngineStarted { directories } => {
                info!(directories, "Engine started");
            }
            ProgressEvent::EngineCompleted { pairs, duration } => {
                info!(
                    pairs,
                    duration_ms = duration.as_millis(),
                    "Engine complete"
                );
            }
            ProgressEvent::ReportMaterialized {
                session_id,
                bundle_extracted,
                documents,
            } => {
                if *bundle_extracted {
                    info!(session_id = %session_id, documents, "Report materialized");
                } else {
                    warn!(
                        session_id = %session_id,
                        documents,
                        "Report materialized without bundle"
                    );
                }
            }
            ProgressEvent::Completed {
                comparisons,
                degraded,
                total_time,
            } => {
                info!(
                    comparisons,
                    degraded,
                    total_time_ms = total_time.as_millis(),
                    "Analysis complete"
                );
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Analysis failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::SessionOpened {
                session_id: "3f2b8c1e".to_string(),
                submissions: 3,
            },
            ProgressEvent::SubmissionStaged {
                submission_id: 19,
                source_files: 4,
            },
            ProgressEvent::SubmissionStaged {
                submission_id: 20,
                source_files: 0,
            },
            ProgressEvent::SubmissionFailed {
                submission_id: 21,
                error: "Invalid repository URL".to_string(),
            },
            ProgressEvent::EngineStarted { directories: 2 },
            ProgressEvent::EngineCompleted {
                pairs: 1,
                duration: Duration::from_millis(100),
            },
            ProgressEvent::ReportMaterialized {
                session_id: "3f2b8c1e".to_string(),
                bundle_extracted: true,
                documents: 1,
            },
            ProgressEvent::ReportMaterialized {
                session_id: "3f2b8c1e".to_string(),
                bundle_extracted: false,
                documents: 0,
            },
            ProgressEvent::Completed {
                comparisons: 1,
                degraded: 0,
                total_time: Duration::from_secs(5),
            },
            ProgressEvent::Failed {
                error: "Test error".to_string(),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
