//! Lookups over materialized reports

use super::render::ComparisonRenderer;
use super::{normalize_entry_name, ReportError};
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use uuid::Uuid;

/// Entry point document inside every bundle
pub const ENTRY_POINT: &str = "index.html";

/// Metadata of a rendered comparison document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonDocument {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Read access to report bundles and comparison documents
#[derive(Debug, Clone)]
pub struct ReportStore {
    reports_dir: PathBuf,
    comparisons_dir: PathBuf,
    public_base_url: String,
}

/// MIME type for a served report file, by extension
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn asset_link_regex() -> &'static Regex {
    static ASSET_LINK: OnceLock<Regex> = OnceLock::new();
    ASSET_LINK.get_or_init(|| {
        Regex::new(r#"(href|src)="([^"]+\.(?:css|js|png|jpg|jpeg|gif|svg|html))""#)
            .expect("Invalid asset link regex")
    })
}

fn is_relative_link(link: &str) -> bool {
    let lower = link.to_ascii_lowercase();
    !(lower.starts_with('/')
        || lower.starts_with('#')
        || lower.starts_with("http:")
        || lower.starts_with("https:")
        || lower.starts_with("data:"))
}

/// Session ids are UUIDs; anything else never becomes part of a path
fn parse_session(session_id: &str) -> Result<String, ReportError> {
    Uuid::parse_str(session_id)
        .map(|id| id.to_string())
        .map_err(|_| ReportError::InvalidSession(session_id.to_string()))
}

impl ReportStore {
    pub fn new(
        reports_dir: impl Into<PathBuf>,
        comparisons_dir: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            comparisons_dir: comparisons_dir.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Directory holding the unpacked bundle of a session
    pub fn report_dir(&self, session_id: &str) -> Result<PathBuf, ReportError> {
        Ok(self.reports_dir.join(parse_session(session_id)?))
    }

    /// True when the session's bundle has an entry point
    pub fn report_exists(&self, session_id: &str) -> bool {
        self.report_dir(session_id)
            .map(|dir| dir.join(ENTRY_POINT).is_file())
            .unwrap_or(false)
    }

    /// Entry point HTML with relative asset links pointing at the served bundle
    pub fn entry_point(&self, session_id: &str) -> Result<String, ReportError> {
        let dir = self.report_dir(session_id)?;
        let path = dir.join(ENTRY_POINT);
        if !path.is_file() {
            return Err(ReportError::NotFound(session_id.to_string()));
        }
        let html = fs::read_to_string(&path).map_err(|source| ReportError::Read {
            path: path.clone(),
            source,
        })?;
        let base = format!("{}/{}/", self.public_base_url, parse_session(session_id)?);
        Ok(rewrite_links(&html, &base))
    }

    /// Resolves a file inside a session's bundle
    ///
    /// The path must stay within the bundle after symlinks are resolved.
    pub fn resolve_file(&self, session_id: &str, relative: &str) -> Result<PathBuf, ReportError> {
        let dir = self.report_dir(session_id)?;
        let root = dir
            .canonicalize()
            .map_err(|_| ReportError::NotFound(session_id.to_string()))?;

        let relative = normalize_entry_name(relative)
            .map_err(|_| ReportError::OutsideReport(relative.to_string()))?
            .ok_or_else(|| ReportError::OutsideReport(relative.to_string()))?;

        let candidate = root.join(&relative);
        let resolved = candidate
            .canonicalize()
            .map_err(|_| ReportError::NotFound(relative.display().to_string()))?;

        if !resolved.starts_with(&root) {
            return Err(ReportError::OutsideReport(relative.display().to_string()));
        }
        if !resolved.is_file() {
            return Err(ReportError::NotFound(relative.display().to_string()));
        }
        Ok(resolved)
    }

    /// Looks up the comparison document for two submissions, in either order
    pub fn comparison_document(
        &self,
        session_id: &str,
        id1: i64,
        id2: i64,
    ) -> Result<Option<ComparisonDocument>, ReportError> {
        let session = parse_session(session_id)?;
        let path = self
            .comparisons_dir
            .join(session)
            .join(ComparisonRenderer::file_name(id1, id2));

        let metadata = match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ReportError::Read { path, source }),
        };

        Ok(Some(ComparisonDocument {
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            path,
        }))
    }
}

/// Prefixes relative stylesheet, script, image and page links with `base`
pub fn rewrite_links(html: &str, base: &str) -> String {
    asset_link_regex()
        .replace_all(html, |caps: &Captures<'_>| {
            let attribute = &caps[1];
            let link = &caps[2];
            if is_relative_link(link) {
                format!(
                    "{}=\"{}{}\"",
                    attribute,
                    base,
                    link.trim_start_matches("./")
                )
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}
