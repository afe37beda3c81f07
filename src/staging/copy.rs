//! Filtered copy of a cloned repository into the engine corpus

use super::StagingError;
use ignore::{DirEntry, WalkBuilder};
use std::fs;
use std::path::Path;
use tracing::{trace, warn};

/// Directory names never copied into the corpus
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "target",
    "build",
    "out",
    "bin",
    "node_modules",
    ".idea",
    ".vscode",
    ".gradle",
    "dist",
];

/// Result of copying one repository tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files_copied: usize,
    pub files_skipped: usize,
    pub directories_created: usize,
}

fn is_excluded(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
    if !is_dir {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || EXCLUDED_DIRS.contains(&name.as_ref())
}

/// True when `path` ends with one of `suffixes` (already lowercase, dot-prefixed)
pub fn has_source_suffix(path: &Path, suffixes: &[String]) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    suffixes.iter().any(|s| name.ends_with(s.as_str()))
}

/// Copies the source files of `source` into `target`, keeping relative paths
///
/// Excluded and hidden directories are pruned. Symbolic links are never followed or
/// copied. Individual file failures are logged and counted, not propagated.
pub fn copy_source_tree(
    source: &Path,
    target: &Path,
    suffixes: &[String],
) -> Result<CopyStats, StagingError> {
    if target.exists() {
        return Err(StagingError::TargetExists(target.to_path_buf()));
    }
    fs::create_dir_all(target).map_err(|e| StagingError::Copy {
        path: target.to_path_buf(),
        source: e,
    })?;

    let mut stats = CopyStats::default();

    let walker = WalkBuilder::new(source)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(|entry| !is_excluded(entry))
        .build();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "Failed to read directory entry while staging");
                stats.files_skipped += 1;
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        let relative = match entry.path().strip_prefix(source) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let destination = target.join(relative);
        let file_type = match entry.file_type() {
            Some(t) => t,
            None => continue,
        };

        if file_type.is_dir() {
            fs::create_dir_all(&destination).map_err(|e| StagingError::Copy {
                path: destination.clone(),
                source: e,
            })?;
            stats.directories_created += 1;
        } else if file_type.is_file() && has_source_suffix(entry.path(), suffixes) {
            match fs::copy(entry.path(), &destination) {
                Ok(_) => {
                    trace!(file = %relative.display(), "Copied source file");
                    stats.files_copied += 1;
                }
                Err(err) => {
                    warn!(
                        file = %entry.path().display(),
                        error = %err,
                        "Failed to copy source file"
                    );
                    stats.files_skipped += 1;
                }
            }
        }
    }

    Ok(stats)
}
