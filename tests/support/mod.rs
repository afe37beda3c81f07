#![allow(dead_code)]

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use simcheck::engine::{EngineConfig, EngineError, EngineRun, SimilarityEngine};
use simcheck::model::PairwiseResult;
use simcheck::staging::{RepositoryCloner, StagingError};
use simcheck::SimcheckConfig;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Writes canned repository contents instead of cloning
pub struct FixtureCloner {
    repos: HashMap<String, Vec<(String, String)>>,
    calls: Mutex<Vec<String>>,
}

impl FixtureCloner {
    pub fn new() -> Self {
        Self {
            repos: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_repo(mut self, url: &str, files: &[(&str, &str)]) -> Self {
        self.repos.insert(
            url.to_string(),
            files
                .iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RepositoryCloner for FixtureCloner {
    async fn clone_repository(&self, url: &str, target: &Path) -> Result<(), StagingError> {
        self.calls.lock().unwrap().push(url.to_string());
        if target.exists() {
            return Err(StagingError::TargetExists(target.to_path_buf()));
        }
        let files = self.repos.get(url).ok_or_else(|| StagingError::CloneFailed {
            url: url.to_string(),
            message: "repository not found".to_string(),
        })?;
        fs::create_dir_all(target).unwrap();
        for (path, content) in files {
            let full = target.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

/// Engine that drops a prepared bundle file into its output directory
pub struct BundleEngine {
    pub results: Vec<PairwiseResult>,
    pub bundle: Vec<u8>,
}

#[async_trait]
impl SimilarityEngine for BundleEngine {
    async fn run(
        &self,
        _corpus: &[PathBuf],
        _config: &EngineConfig,
        output_dir: &Path,
    ) -> Result<EngineRun, EngineError> {
        let path = output_dir.join("report.bundle");
        fs::write(&path, &self.bundle).map_err(|e| EngineError::Other(e.to_string()))?;
        Ok(EngineRun {
            results: self.results.clone(),
            bundle: Some(path),
        })
    }

    fn name(&self) -> &str {
        "bundle"
    }
}

/// Configuration rooted in a temporary directory
pub fn test_config(temp: &TempDir) -> SimcheckConfig {
    let mut config = SimcheckConfig::default();
    config.temp_dir = temp.path().join("work");
    config.reports_dir = temp.path().join("reports");
    config.comparisons_dir = temp.path().join("comparisons");
    config.public_base_url = "https://simcheck.example/reports".to_string();
    config.file_suffixes = vec![".java".to_string()];
    config.similarity_threshold = 0.0;
    config.max_submissions = 100;
    config.staging_concurrency = 4;
    config
}

/// Gzip-compressed tar whose entries carry their names verbatim
///
/// Bypasses the path checks of `tar::Builder::append_data` so hostile names such as
/// `../../etc/passwd` end up in the archive.
pub fn raw_tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in entries {
        let mut header = tar::Header::new_old();
        let bytes = name.as_bytes();
        header.as_old_mut().name[..bytes.len()].copy_from_slice(bytes);
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, *content).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Unix mode of a regular file entry in [`raw_zip_with_modes`]
pub const REGULAR_FILE: u32 = 0o100644;
/// Unix mode of a symbolic link entry in [`raw_zip_with_modes`]
pub const SYMLINK: u32 = 0o120777;

/// Stored (uncompressed) zip whose entries carry their names verbatim
pub fn raw_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let entries: Vec<(&str, &[u8], u32)> = entries
        .iter()
        .map(|(name, content)| (*name, *content, REGULAR_FILE))
        .collect();
    raw_zip_with_modes(&entries)
}

/// Stored zip built byte by byte, with a Unix mode per entry
///
/// Writing the headers directly keeps hostile names such as `../../etc/passwd` intact.
pub fn raw_zip_with_modes(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    const VERSION: u16 = 20;
    const MADE_BY_UNIX: u16 = (3 << 8) | VERSION;
    const DOS_DATE_1980_01_01: u16 = 0x0021;

    let mut out = Vec::new();
    let mut central = Vec::new();

    for (name, content, mode) in entries {
        let mut crc = flate2::Crc::new();
        crc.update(content);
        let crc = crc.sum();
        let size = content.len() as u32;
        let offset = out.len() as u32;

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&0u16.to_le_bytes()); // stored
        out.extend_from_slice(&0u16.to_le_bytes()); // time
        out.extend_from_slice(&DOS_DATE_1980_01_01.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(content);

        central.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        central.extend_from_slice(&MADE_BY_UNIX.to_le_bytes());
        central.extend_from_slice(&VERSION.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes()); // flags
        central.extend_from_slice(&0u16.to_le_bytes()); // stored
        central.extend_from_slice(&0u16.to_le_bytes()); // time
        central.extend_from_slice(&DOS_DATE_1980_01_01.to_le_bytes());
        central.extend_from_slice(&crc.to_le_bytes());
        central.extend_from_slice(&size.to_le_bytes());
        central.extend_from_slice(&size.to_le_bytes());
        central.extend_from_slice(&(name.len() as u16).to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes()); // extra
        central.extend_from_slice(&0u16.to_le_bytes()); // comment
        central.extend_from_slice(&0u16.to_le_bytes()); // disk
        central.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
        central.extend_from_slice(&(mode << 16).to_le_bytes());
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name.as_bytes());
    }

    let central_offset = out.len() as u32;
    let central_size = central.len() as u32;
    let count = entries.len() as u16;
    out.extend_from_slice(&central);
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // this disk
    out.extend_from_slice(&0u16.to_le_bytes()); // central directory disk
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&central_size.to_le_bytes());
    out.extend_from_slice(&central_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // comment
    out
}

/// Every file below `root` with its content, keyed by relative path
pub fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let content = fs::read(&path).unwrap();
                files.push((path.strip_prefix(root).unwrap().to_path_buf(), content));
            }
        }
    }
    files.sort();
    files
}

/// True when `dir` is missing or has no entries
pub fn is_empty_dir(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}
