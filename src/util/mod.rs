//! Utility modules for simcheck

pub mod logging;

pub use logging::{init_logging, LoggingConfig};
