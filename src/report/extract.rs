//! Safe unpacking of report bundles
//!
//! Entry names are untrusted. Every entry is normalized, checked for parent
//! traversal, and its resolved location must stay inside the canonical destination
//! before anything is written. Any violation aborts the whole extraction.

use super::archive::{ArchiveEntry, ArchiveReader};
use super::ExtractionError;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// What an extraction wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// Normalizes a raw entry name into a relative path
///
/// Backslashes become forward slashes, leading separators and `.` segments are
/// dropped. Returns `Ok(None)` for names that normalize to nothing.
pub fn normalize_entry_name(raw: &str) -> Result<Option<PathBuf>, ExtractionError> {
    let unified = raw.replace('\\', "/");
    let mut relative = PathBuf::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(ExtractionError::UnsafeEntry {
                    name: raw.to_string(),
                    reason: "parent directory traversal".to_string(),
                })
            }
            s if s.contains(':') || s.contains('\0') => {
                return Err(ExtractionError::UnsafeEntry {
                    name: raw.to_string(),
                    reason: "invalid path segment".to_string(),
                })
            }
            s => relative.push(s),
        }
    }

    // Anything other than plain names here means the platform parsed a prefix or root
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(ExtractionError::UnsafeEntry {
            name: raw.to_string(),
            reason: "absolute or prefixed path".to_string(),
        });
    }

    if relative.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(relative))
    }
}

/// Verifies that the existing part of `target` resolves inside `root`
///
/// `root` must already be canonical. The deepest existing ancestor is canonicalized so
/// symlinked directories inside the destination cannot redirect writes elsewhere.
fn ensure_contained(root: &Path, target: &Path, name: &str) -> Result<(), ExtractionError> {
    if !target.starts_with(root) {
        return Err(escapes(name));
    }

    if let Ok(meta) = fs::symlink_metadata(target) {
        if meta.file_type().is_symlink() {
            return Err(ExtractionError::UnsafeEntry {
                name: name.to_string(),
                reason: "entry would be written through a symbolic link".to_string(),
            });
        }
    }

    let mut existing = target;
    while fs::symlink_metadata(existing).is_err() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => return Err(escapes(name)),
        }
    }

    let resolved = existing.canonicalize().map_err(|source| ExtractionError::Io {
        path: existing.to_path_buf(),
        source,
    })?;
    if !resolved.starts_with(root) {
        return Err(escapes(name));
    }

    Ok(())
}

fn escapes(name: &str) -> ExtractionError {
    ExtractionError::UnsafeEntry {
        name: name.to_string(),
        reason: "resolves outside the destination directory".to_string(),
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ExtractionError + '_ {
    move |source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Unpacks `archive` into `destination`
///
/// Directories are created, files overwrite whatever is at the same path. The first
/// unsafe entry aborts with [`ExtractionError::UnsafeEntry`]; nothing from that entry is
/// written.
pub fn extract_bundle(
    archive: &mut dyn ArchiveReader,
    destination: &Path,
) -> Result<ExtractionSummary, ExtractionError> {
    fs::create_dir_all(destination).map_err(io_error(destination))?;
    let root = destination
        .canonicalize()
        .map_err(io_error(destination))?;

    let mut summary = ExtractionSummary::default();

    archive.for_each_entry(&mut |entry: ArchiveEntry<'_>| {
        let relative = match normalize_entry_name(&entry.name)? {
            Some(relative) => relative,
            None => return Ok(()),
        };
        let target = root.join(&relative);
        ensure_contained(&root, &target, &entry.name)?;

        if entry.is_dir {
            fs::create_dir_all(&target).map_err(io_error(&target))?;
            ensure_contained(&root, &target, &entry.name)?;
            summary.directories += 1;
            return Ok(());
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
            ensure_contained(&root, parent, &entry.name)?;
        }

        let mut file = File::create(&target).map_err(io_error(&target))?;
        let written = io::copy(entry.content, &mut file).map_err(io_error(&target))?;
        summary.files += 1;
        summary.bytes += written;
        debug!(entry = %relative.display(), bytes = written, "Extracted entry");
        Ok(())
    })?;

    info!(
        destination = %root.display(),
        files = summary.files,
        directories = summary.directories,
        "Bundle extracted"
    );
    Ok(summary)
}
