//! Per-request session workspaces
//!
//! A [`Workspace`] hands out [`Session`]s, each owning a freshly created directory named
//! by a random UUID. The session removes its directory tree when closed or dropped, so
//! every exit path of the pipeline (early return, error, panic, abandoned future)
//! reclaims disk.

use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

const CLONES_DIR: &str = "clones";
const CORPUS_DIR: &str = "corpus";
const ENGINE_DIR: &str = "engine";

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Session directory already exists: {0}")]
    SessionCollision(PathBuf),
    #[error("Failed to prepare workspace at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Allocates isolated session directories under a common root
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates a new session with a random identifier
    pub fn open_session(&self) -> Result<Session, WorkspaceError> {
        self.open_session_with_id(Uuid::new_v4())
    }

    /// Creates a session directory for `id`
    ///
    /// The final path component is created non-recursively, so an existing directory
    /// with the same id is reported as a collision instead of being reused.
    pub fn open_session_with_id(&self, id: Uuid) -> Result<Session, WorkspaceError> {
        fs::create_dir_all(&self.root).map_err(|source| WorkspaceError::Io {
            path: self.root.clone(),
            source,
        })?;

        let root = self.root.join(id.to_string());
        match fs::create_dir(&root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(WorkspaceError::SessionCollision(root));
            }
            Err(source) => return Err(WorkspaceError::Io { path: root, source }),
        }

        // From here on the session owns the directory, so failures still clean up
        let session = Session {
            id,
            root,
            created_at: Utc::now(),
            staged: BTreeMap::new(),
            closed: false,
        };

        for sub in [CLONES_DIR, CORPUS_DIR, ENGINE_DIR] {
            let path = session.root.join(sub);
            fs::create_dir(&path).map_err(|source| WorkspaceError::Io { path, source })?;
        }

        info!(session_id = %id, root = %session.root.display(), "Session opened");
        Ok(session)
    }
}

/// Outcome of tearing down a session directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: usize,
}

/// One analysis request's exclusive workspace
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    root: PathBuf,
    created_at: DateTime<Utc>,
    staged: BTreeMap<i64, PathBuf>,
    closed: bool,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Raw clones, one directory per submission
    pub fn clones_dir(&self) -> PathBuf {
        self.root.join(CLONES_DIR)
    }

    /// Filtered copies handed to the engine
    pub fn corpus_dir(&self) -> PathBuf {
        self.root.join(CORPUS_DIR)
    }

    /// Scratch space for the engine, including its report bundle
    pub fn engine_dir(&self) -> PathBuf {
        self.root.join(ENGINE_DIR)
    }

    pub fn record_staged(&mut self, submission_id: i64, path: PathBuf) {
        self.staged.insert(submission_id, path);
    }

    /// Staged directories keyed by submission id
    pub fn staged(&self) -> &BTreeMap<i64, PathBuf> {
        &self.staged
    }

    /// Deletes the session tree and reports what happened
    pub fn close(mut self) -> CleanupReport {
        self.closed = true;
        let report = remove_tree(&self.root);
        info!(
            session_id = %self.id,
            removed = report.removed,
            failed = report.failed,
            "Session closed"
        );
        report
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            let report = remove_tree(&self.root);
            debug!(
                session_id = %self.id,
                removed = report.removed,
                failed = report.failed,
                "Session cleaned up on drop"
            );
        }
    }
}

/// Removes `root` and everything below it, children before parents
///
/// Entries that cannot be removed are logged and counted; the walk continues.
pub fn remove_tree(root: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();

    if fs::symlink_metadata(root).is_err() {
        return report;
    }

    let mut entries: Vec<(PathBuf, bool)> = Vec::new();
    for result in WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .build()
    {
        match result {
            Ok(entry) => {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                entries.push((entry.into_path(), is_dir));
            }
            Err(err) => {
                warn!(error = %err, "Failed to read entry during cleanup");
                report.failed += 1;
            }
        }
    }

    // Reverse path order visits every child before its parent
    entries.sort_by(|a, b| b.0.cmp(&a.0));

    for (path, is_dir) in entries {
        let result = if is_dir {
            fs::remove_dir(&path)
        } else {
            fs::remove_file(&path)
        };
        match result {
            Ok(()) => report.removed += 1,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to delete during cleanup");
                report.failed += 1;
            }
        }
    }

    report
}
