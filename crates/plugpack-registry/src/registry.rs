//! Registry types and the `plugins.json` writer.

use plugpack_core::{IoResultExt, PackageManifest, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the registry catalog.
pub const REGISTRY_FILE: &str = "plugins.json";

/// Outcome of one module's packaging, as needed by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    /// Finalized package manifest.
    pub manifest: PackageManifest,
    /// Location of the written package.
    pub archive_path: PathBuf,
    /// Length of the package in bytes.
    pub file_size: u64,
}

/// One plugin in `plugins.json`: the manifest fields plus location data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// Manifest fields, flattened into the entry.
    #[serde(flatten)]
    pub manifest: PackageManifest,

    /// Where the package can be downloaded.
    pub url: String,

    /// Package length in bytes.
    pub file_size: u64,

    /// Module name the package was built from.
    pub internal_name: String,
}

impl RegistryEntry {
    /// Builds the entry for a packaged module.
    ///
    /// With a `base_url` the entry points to `<base_url>/<name>.cs3`;
    /// otherwise to the local archive path.
    #[must_use]
    pub fn from_record(record: PackageRecord, base_url: Option<&str>) -> Self {
        let url = match base_url {
            Some(base) => {
                let file_name = record
                    .archive_path
                    .file_name()
                    .map_or_else(|| format!("{}.cs3", record.manifest.name), |n| n.to_string_lossy().into_owned());
                format!("{}/{file_name}", base.trim_end_matches('/'))
            }
            None => record.archive_path.display().to_string(),
        };
        let internal_name = record.manifest.name.clone();
        Self {
            manifest: record.manifest,
            url,
            file_size: record.file_size,
            internal_name,
        }
    }

    /// Plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.manifest.name
    }
}

/// Ordered catalog of plugin packages, unique by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from per-module records in declaration order.
    ///
    /// `None` marks a module that never reached the packaged state; it is
    /// left out.
    pub fn aggregate<I>(records: I, base_url: Option<&str>) -> Self
    where
        I: IntoIterator<Item = Option<PackageRecord>>,
    {
        let mut registry = Self::new();
        let mut skipped = 0usize;
        for record in records {
            match record {
                Some(record) => registry.insert(RegistryEntry::from_record(record, base_url)),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!("{} module(s) were not packaged and are missing from the registry", skipped);
        }
        registry
    }

    /// Adds an entry, replacing an existing entry with the same name in place.
    pub fn insert(&mut self, entry: RegistryEntry) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name() == entry.name()) {
            tracing::warn!("Duplicate registry entry '{}', keeping the last one", entry.name());
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    /// Looks up an entry by plugin name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Entries in order.
    #[must_use]
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pretty-printed JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the registry to `path`, replacing any previous file.
    ///
    /// The document is written to a sibling temporary file first and renamed
    /// into place.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }
        let json = self.to_json_pretty()?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_path(&tmp)?;
        fs::rename(&tmp, path).with_path(path)?;

        tracing::info!("Wrote registry with {} plugin(s) to {}", self.len(), path.display());
        Ok(())
    }

    /// Reads a registry written by [`write`](Self::write).
    ///
    /// # Errors
    ///
    /// Returns [`plugpack_core::Error::MissingFile`] if the file does not
    /// exist, or a serialization error if it is not a valid registry.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_path(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a RegistryEntry;
    type IntoIter = std::slice::Iter<'a, RegistryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
