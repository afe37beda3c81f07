//! Request-level orchestration
//!
//! [`DetectionService`] validates a request, stages its submissions into a fresh
//! session, runs the engine, maps results back to caller identities, writes report
//! artifacts and always tears the session down.

mod service;
mod validate;

pub use service::{DetectionService, PipelineError, INSUFFICIENT_MESSAGE, SUCCESS_MESSAGE};
pub use validate::{validate_request, ValidationError, MIN_SUBMISSIONS};
