//! `make`: assembles the final plugin package.

use crate::{Freshness, ModuleState, PackagedArtifact, Stage};
use plugpack_bytecode::BUNDLE_FILE;
use plugpack_core::archive::{ArchiveEntry, read_entries, write_archive};
use plugpack_core::{Error, IoResultExt, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Resource archive entry that is never copied into the package.
pub const RESOURCE_MANIFEST_ENTRY: &str = "AndroidManifest.xml";

/// Package entry holding the manifest.
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Writes `<module>.cs3`: `manifest.json`, `classes.dex`, then the compiled
/// resource entries sorted by name. Always runs.
#[derive(Debug)]
pub struct PackageStage {
    state: Arc<ModuleState>,
}

impl PackageStage {
    /// Stage name.
    pub const NAME: &'static str = "make";

    /// Creates the stage.
    #[must_use]
    pub const fn new(state: Arc<ModuleState>) -> Self {
        Self { state }
    }

    fn resource_entries(&self) -> Result<Vec<ArchiveEntry>> {
        let resources = &self.state.layout.resources;
        if !self.state.module.requires_resources {
            return Ok(Vec::new());
        }
        if !resources.is_file() {
            tracing::warn!(
                "Resource compiler produced no {} for {}",
                resources.display(),
                self.state.name()
            );
            return Ok(Vec::new());
        }

        let mut entries = read_entries(resources)?;
        entries.retain(|e| ![RESOURCE_MANIFEST_ENTRY, MANIFEST_ENTRY, BUNDLE_FILE].contains(&e.name.as_str()));
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

impl Stage for PackageStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn module(&self) -> Option<&str> {
        Some(self.state.name())
    }

    fn freshness(&self) -> Freshness {
        Freshness::AlwaysStale
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.state.layout.package.clone()]
    }

    fn execute(&self) -> Result<()> {
        let entry_point = self.state.entry_point.get()?;
        let manifest = self.state.manifest.get()?;
        let layout = &self.state.layout;

        let bundle = fs::read(&layout.bundle).with_path(&layout.bundle)?;
        let mut entries = vec![
            ArchiveEntry::new(MANIFEST_ENTRY, manifest.to_json()?.into_bytes()),
            ArchiveEntry::new(BUNDLE_FILE, bundle),
        ];
        entries.extend(self.resource_entries()?);

        write_archive(&layout.package, &entries)?;
        let file_size = fs::metadata(&layout.package)
            .with_path(&layout.package)?
            .len();
        if file_size == 0 {
            return Err(Error::ArchiveError {
                path: layout.package.clone(),
                message: "package is empty".to_string(),
            });
        }

        tracing::info!("Made plugin package at {}", layout.package.display());
        tracing::debug!("{} loads entry point {}", self.state.name(), entry_point);

        self.state.packaged.set(PackagedArtifact {
            path: layout.package.clone(),
            file_size,
        })
    }
}
