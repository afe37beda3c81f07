//! Sequential archive access
//!
//! Report bundles are read through [`ArchiveReader`], which yields entries one at a
//! time as `(name, is_dir, content)`. Extraction and bundle parsing only depend on the
//! trait. [`open_bundle`] picks the reader from the file's leading bytes, so engines
//! may emit either a zip or a gzip-compressed tar.

use super::ExtractionError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, Write};
use std::path::Path;
use tar::EntryType;
use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// One archive entry as seen by a visitor
pub struct ArchiveEntry<'a> {
    /// Raw entry name exactly as stored in the archive
    pub name: String,
    pub is_dir: bool,
    pub content: &'a mut dyn Read,
}

/// Sequential iteration over archive entries
pub trait ArchiveReader {
    /// Calls `visit` for every entry in archive order, stopping at the first error
    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(ArchiveEntry<'_>) -> Result<(), ExtractionError>,
    ) -> Result<(), ExtractionError>;
}

/// Gzip-compressed tar archive
pub struct TarGzArchive<R: Read> {
    archive: tar::Archive<GzDecoder<R>>,
}

impl TarGzArchive<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, ExtractionError> {
        let file = File::open(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> TarGzArchive<R> {
    pub fn new(reader: R) -> Self {
        Self {
            archive: tar::Archive::new(GzDecoder::new(reader)),
        }
    }
}

impl<R: Read> ArchiveReader for TarGzArchive<R> {
    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(ArchiveEntry<'_>) -> Result<(), ExtractionError>,
    ) -> Result<(), ExtractionError> {
        let entries = self.archive.entries().map_err(ExtractionError::Read)?;

        for entry in entries {
            let mut entry = entry.map_err(ExtractionError::Read)?;
            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let entry_type = entry.header().entry_type();

            let is_dir = match entry_type {
                EntryType::Directory => true,
                EntryType::Regular | EntryType::Continuous => false,
                EntryType::Symlink | EntryType::Link => {
                    return Err(ExtractionError::UnsupportedEntry {
                        name,
                        kind: "link".to_string(),
                    });
                }
                other => {
                    debug!(entry = %name, kind = ?other, "Skipping special archive entry");
                    continue;
                }
            };

            visit(ArchiveEntry {
                name,
                is_dir,
                content: &mut entry,
            })?;
        }

        Ok(())
    }
}

/// Zip archive, read entry by entry in central directory order
pub struct ZipArchive<R: Read + Seek> {
    archive: zip::ZipArchive<R>,
}

impl ZipArchive<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, ExtractionError> {
        let file = File::open(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> ZipArchive<R> {
    /// Reads the central directory; fails when `reader` is not a zip
    pub fn new(reader: R) -> Result<Self, ExtractionError> {
        let archive = zip::ZipArchive::new(reader).map_err(zip_read_error)?;
        Ok(Self { archive })
    }
}

fn zip_read_error(err: ZipError) -> ExtractionError {
    match err {
        ZipError::Io(source) => ExtractionError::Read(source),
        other => ExtractionError::Read(io::Error::new(io::ErrorKind::InvalidData, other)),
    }
}

impl<R: Read + Seek> ArchiveReader for ZipArchive<R> {
    fn for_each_entry(
        &mut self,
        visit: &mut dyn FnMut(ArchiveEntry<'_>) -> Result<(), ExtractionError>,
    ) -> Result<(), ExtractionError> {
        for index in 0..self.archive.len() {
            let mut file = self.archive.by_index(index).map_err(zip_read_error)?;
            // Raw name; containment is enforced by the extractor
            let name = file.name().to_string();

            if file
                .unix_mode()
                .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
            {
                return Err(ExtractionError::UnsupportedEntry {
                    name,
                    kind: "link".to_string(),
                });
            }

            let is_dir = file.is_dir();
            visit(ArchiveEntry {
                name,
                is_dir,
                content: &mut file,
            })?;
        }

        Ok(())
    }
}

/// Container formats recognized by [`open_bundle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleFormat {
    Zip,
    TarGz,
}

impl BundleFormat {
    /// Identifies the format from the first bytes of a file
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        match header {
            [b'P', b'K', 3, 4, ..] | [b'P', b'K', 5, 6, ..] | [b'P', b'K', 7, 8, ..] => {
                Some(BundleFormat::Zip)
            }
            [0x1f, 0x8b, ..] => Some(BundleFormat::TarGz),
            _ => None,
        }
    }

    /// Reads the leading bytes of `path` and identifies its format
    pub fn detect(path: &Path) -> Result<Self, ExtractionError> {
        let io_error = |source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut header = Vec::with_capacity(4);
        File::open(path)
            .map_err(io_error)?
            .take(4)
            .read_to_end(&mut header)
            .map_err(io_error)?;

        Self::from_magic(&header).ok_or_else(|| ExtractionError::UnknownFormat(path.to_path_buf()))
    }
}

/// Opens a report bundle with the reader matching its content
pub fn open_bundle(path: &Path) -> Result<Box<dyn ArchiveReader>, ExtractionError> {
    let format = BundleFormat::detect(path)?;
    debug!(path = %path.display(), ?format, "Opening report bundle");
    Ok(match format {
        BundleFormat::Zip => Box::new(ZipArchive::open(path)?),
        BundleFormat::TarGz => Box::new(TarGzArchive::open(path)?),
    })
}

/// Writes `files` into a new deflate-compressed zip archive at `path`
///
/// Names ending in `/` become directory entries.
pub fn write_zip(path: &Path, files: &[(String, Vec<u8>)]) -> io::Result<()> {
    let to_io = |e: ZipError| io::Error::new(io::ErrorKind::Other, e);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = zip::ZipWriter::new(File::create(path)?);

    for (name, content) in files {
        if name.ends_with('/') {
            writer.add_directory(name.as_str(), options).map_err(to_io)?;
        } else {
            writer.start_file(name.as_str(), options).map_err(to_io)?;
            writer.write_all(content)?;
        }
    }

    writer.finish().map_err(to_io)?;
    Ok(())
}

/// Writes `files` into a new gzip-compressed tar archive at `path`
///
/// Names ending in `/` become directory entries.
pub fn write_tar_gz(path: &Path, files: &[(String, Vec<u8>)]) -> io::Result<()> {
    let encoder = GzEncoder::new(File::create(path)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_mode(if name.ends_with('/') { 0o755 } else { 0o644 });
        header.set_mtime(0);
        if name.ends_with('/') {
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            builder.append_data(&mut header, name, io::empty())?;
        } else {
            header.set_entry_type(EntryType::Regular);
            header.set_size(content.len() as u64);
            builder.append_data(&mut header, name, content.as_slice())?;
        }
    }

    builder.into_inner()?.finish()?;
    Ok(())
}
