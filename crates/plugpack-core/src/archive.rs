//! Deterministic zip containers.
//!
//! Packages, plugin jars, and the built-in class bundle are all zip files.
//! Every entry is written with the zip epoch (1980-01-01 00:00:00) as its
//! timestamp and fixed permissions, and entries are written in the order the
//! caller gives, so identical inputs produce byte-identical archives.
//!
//! # Examples
//!
//! ```
//! use plugpack_core::archive::{ArchiveEntry, read_entries, write_archive};
//!
//! # fn main() -> plugpack_core::Result<()> {
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("out.zip");
//!
//! write_archive(&path, &[
//!     ArchiveEntry::new("manifest.json", b"{}".to_vec()),
//!     ArchiveEntry::new("classes.dex", vec![0xde, 0x78]),
//! ])?;
//!
//! let entries = read_entries(&path)?;
//! assert_eq!(entries[0].name, "manifest.json");
//! assert_eq!(entries[1].data, vec![0xde, 0x78]);
//! # Ok(())
//! # }
//! ```

use crate::{Error, IoResultExt, Result};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Permissions stored for every entry.
const ENTRY_PERMISSIONS: u32 = 0o644;

/// One file inside a zip container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry path inside the archive (`/`-separated, no leading slash).
    pub name: String,
    /// Uncompressed content.
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(ENTRY_PERMISSIONS)
}

/// Removes a partially written file unless committed.
struct PartialFileGuard {
    path: PathBuf,
    cleanup: bool,
}

impl PartialFileGuard {
    const fn new(path: PathBuf) -> Self {
        Self {
            path,
            cleanup: true,
        }
    }

    fn commit(mut self) {
        self.cleanup = false;
    }
}

impl Drop for PartialFileGuard {
    fn drop(&mut self) {
        if self.cleanup {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!("Failed to clean up partial archive {}: {}", self.path.display(), e);
            } else {
                tracing::debug!("Removed partial archive: {}", self.path.display());
            }
        }
    }
}

/// Writes `entries` in the given order to a new archive at `path`.
///
/// Parent directories are created as needed; an existing file is replaced.
/// If writing fails, the partial archive is removed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or an entry cannot be
/// written.
pub fn write_archive(path: &Path, entries: &[ArchiveEntry]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_path(parent)?;
    }

    let file = File::create(path).with_path(path)?;
    let guard = PartialFileGuard::new(path.to_path_buf());

    let mut writer = ZipWriter::new(file);
    let options = entry_options();
    for entry in entries {
        writer
            .start_file(entry.name.as_str(), options)
            .map_err(|e| Error::archive(path, &e))?;
        writer.write_all(&entry.data).with_path(path)?;
        tracing::debug!("Wrote archive entry {} ({} bytes)", entry.name, entry.data.len());
    }
    writer.finish().map_err(|e| Error::archive(path, &e))?;

    guard.commit();
    Ok(())
}

/// Reads every file entry of an archive, in central-directory order.
///
/// Directory entries are skipped.
///
/// # Errors
///
/// Returns [`Error::MissingFile`] if `path` does not exist, or
/// [`Error::ArchiveError`] if it is not a valid zip file.
pub fn read_entries(path: &Path) -> Result<Vec<ArchiveEntry>> {
    let file = File::open(path).with_path(path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| Error::archive(path, &e))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| Error::archive(path, &e))?;
        if file.is_dir() {
            continue;
        }
        let mut data = Vec::new();
        file.read_to_end(&mut data).with_path(path)?;
        entries.push(ArchiveEntry::new(file.name(), data));
    }
    Ok(entries)
}

/// Reads a single entry by name.
///
/// # Errors
///
/// Returns [`Error::MissingFile`] (with an `archive!entry` path) if the entry
/// does not exist, or an archive error if the file is not a valid zip.
pub fn read_entry(path: &Path, name: &str) -> Result<Vec<u8>> {
    let file = File::open(path).with_path(path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| Error::archive(path, &e))?;

    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(Error::MissingFile {
                path: PathBuf::from(format!("{}!{name}", path.display())),
            });
        }
        Err(e) => return Err(Error::archive(path, &e)),
    };

    let mut data = Vec::new();
    entry.read_to_end(&mut data).with_path(path)?;
    Ok(data)
}
