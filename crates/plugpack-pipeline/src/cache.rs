//! Stage fingerprints and the fingerprint cache.
//!
//! A fingerprint is a Blake3 digest over everything a stage reads, in the
//! format `"blake3:<hex>"`. The cache maps `module:stage` keys to the
//! fingerprint recorded after the stage last succeeded, and is persisted as
//! JSON in the build directory.

use plugpack_core::{IoResultExt, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Incremental Blake3 fingerprint of stage inputs.
///
/// Every value is written with a label and a length prefix so that adjacent
/// values cannot run into each other.
///
/// # Examples
///
/// ```
/// use plugpack_pipeline::Fingerprinter;
///
/// let mut a = Fingerprinter::new("writeManifest");
/// a.text("entry", "com.example.Plugin").number("size", 10);
///
/// let mut b = Fingerprinter::new("writeManifest");
/// b.text("entry", "com.example.Plugin").number("size", 11);
///
/// assert!(a.finish().starts_with("blake3:"));
/// assert_ne!(a.finish(), b.finish());
/// ```
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    hasher: blake3::Hasher,
}

impl Fingerprinter {
    /// Starts a fingerprint for the named stage.
    #[must_use]
    pub fn new(stage: &str) -> Self {
        let mut fingerprinter = Self {
            hasher: blake3::Hasher::new(),
        };
        fingerprinter.text("stage", stage);
        fingerprinter
    }

    fn field(&mut self, label: &str, bytes: &[u8]) -> &mut Self {
        for part in [label.as_bytes(), bytes] {
            self.hasher.update(&(part.len() as u64).to_le_bytes());
            self.hasher.update(part);
        }
        self
    }

    /// Adds a string value.
    pub fn text(&mut self, label: &str, value: &str) -> &mut Self {
        self.field(label, value.as_bytes())
    }

    /// Adds a number.
    pub fn number(&mut self, label: &str, value: u64) -> &mut Self {
        self.field(label, &value.to_le_bytes())
    }

    /// Adds a flag.
    pub fn flag(&mut self, label: &str, value: bool) -> &mut Self {
        self.field(label, &[u8::from(value)])
    }

    /// Adds a path and the content of the file, or every file below the
    /// directory in sorted order. A missing path is recorded as missing.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read.
    pub fn path(&mut self, label: &str, path: &Path) -> Result<&mut Self> {
        self.text(label, &path.display().to_string());
        if path.is_file() {
            let content = fs::read(path).with_path(path)?;
            self.field("file", &content);
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_file())
            {
                let relative = entry.path().strip_prefix(path).unwrap_or_else(|_| entry.path());
                let content = fs::read(entry.path()).with_path(entry.path())?;
                self.text("entry", &relative.to_string_lossy());
                self.field("file", &content);
            }
        } else {
            self.field("missing", &[]);
        }
        Ok(self)
    }

    /// Finishes the fingerprint as `"blake3:<hex>"`.
    #[must_use]
    pub fn finish(&self) -> String {
        format!("blake3:{}", self.hasher.finalize().to_hex())
    }
}

/// Persisted `module:stage` to fingerprint map.
#[derive(Debug, Clone, Default)]
pub struct FingerprintCache {
    path: Option<PathBuf>,
    records: BTreeMap<String, String>,
}

impl FingerprintCache {
    /// Cache that is never persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Empty cache that will be written to `path`.
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            records: BTreeMap::new(),
        }
    }

    /// Loads the cache from `path`.
    ///
    /// A missing file yields an empty cache. An unreadable or corrupt file is
    /// reported as a warning and also yields an empty cache, so every stage
    /// runs again.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!("Ignoring corrupt fingerprint cache {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Cannot read fingerprint cache {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        tracing::debug!("Loaded {} fingerprint(s) from {}", records.len(), path.display());
        Self {
            path: Some(path),
            records,
        }
    }

    /// Recorded fingerprint for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.records.get(key).map(String::as_str)
    }

    /// Records the fingerprint of a successful run.
    pub fn record(&mut self, key: impl Into<String>, fingerprint: impl Into<String>) {
        self.records.insert(key.into(), fingerprint.into());
    }

    /// Forgets `key`, forcing the stage to run next time.
    pub fn invalidate(&mut self, key: &str) {
        self.records.remove(key);
    }

    /// Snapshot of all records.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.records.clone()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes the cache to its file; a no-op for in-memory caches.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.records)?;
        fs::write(path, json).with_path(path)
    }
}
