//! Report materialization
//!
//! Unpacks the engine's report bundle into the reports root, renders one stand-alone
//! comparison document per analyzed pair into the comparisons root, and looks up
//! those artifacts afterwards.

pub mod archive;
mod extract;
mod render;
mod store;

pub use archive::{
    open_bundle, write_tar_gz, write_zip, ArchiveEntry, ArchiveReader, BundleFormat,
    TarGzArchive, ZipArchive,
};
pub use extract::{extract_bundle, normalize_entry_name, ExtractionSummary};
pub use render::{ComparisonRenderer, RenderedDocument, RiskLevel};
pub use store::{content_type_for, ComparisonDocument, ReportStore};

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsafe archive entry '{name}': {reason}")]
    UnsafeEntry { name: String, reason: String },
    #[error("Unsupported archive entry '{name}' ({kind})")]
    UnsupportedEntry { name: String, kind: String },
    #[error("Failed to read archive: {0}")]
    Read(io::Error),
    #[error("Unrecognized archive format: {0}")]
    UnknownFormat(PathBuf),
    #[error("I/O error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl ExtractionError {
    /// True for entries rejected by the containment rules
    pub fn is_security_violation(&self) -> bool {
        matches!(
            self,
            ExtractionError::UnsafeEntry { .. } | ExtractionError::UnsupportedEntry { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid session id: {0}")]
    InvalidSession(String),
    #[error("Report not found for session {0}")]
    NotFound(String),
    #[error("Requested path is outside the report directory: {0}")]
    OutsideReport(String),
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Public URL of a session's bundle viewer
pub fn viewer_url(base_url: &str, session_id: &str) -> String {
    format!("{}/viewer/{}", base_url.trim_end_matches('/'), session_id)
}

/// Public URL of one rendered comparison document
pub fn comparison_url(base_url: &str, session_id: &str, file_name: &str) -> String {
    format!(
        "{}/comparison/{}/{}",
        base_url.trim_end_matches('/'),
        session_id,
        file_name
    )
}
