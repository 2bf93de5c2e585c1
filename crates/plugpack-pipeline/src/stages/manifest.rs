//! `writeManifest`: finalizes and writes `manifest.json`.

use crate::{Fingerprinter, ModuleState, Stage};
use plugpack_core::{IoResultExt, PackageManifest, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Builds the manifest from configuration and the resolved cells.
///
/// Runs strictly after the compiler and, when they are wired, after the jar
/// packager, the compatibility check and the resource compiler.
#[derive(Debug)]
pub struct ManifestStage {
    state: Arc<ModuleState>,
}

impl ManifestStage {
    /// Stage name.
    pub const NAME: &'static str = "writeManifest";

    /// Creates the stage.
    #[must_use]
    pub const fn new(state: Arc<ModuleState>) -> Self {
        Self { state }
    }

    fn build(&self) -> Result<PackageManifest> {
        let entry = self.state.entry_point.cloned()?;
        let byte_size = if self.state.module.packages_jar() {
            Some(*self.state.jar_size.get()?)
        } else {
            None
        };
        Ok(PackageManifest::from_module(&self.state.module).finalize(entry, byte_size))
    }
}

impl Stage for ManifestStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn module(&self) -> Option<&str> {
        Some(self.state.name())
    }

    fn fingerprint(&self) -> Result<Option<String>> {
        let json = self.build()?.to_json()?;
        let mut fp = Fingerprinter::new(Self::NAME);
        fp.text("manifest", &json);
        Ok(Some(fp.finish()))
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.state.layout.manifest.clone()]
    }

    fn restore(&self) -> Result<()> {
        let path = &self.state.layout.manifest;
        let manifest = PackageManifest::from_json(&fs::read_to_string(path).with_path(path)?)?;
        self.state.manifest.set(manifest)
    }

    fn execute(&self) -> Result<()> {
        let manifest = self.build()?;
        let layout = &self.state.layout;

        fs::create_dir_all(&layout.intermediates).with_path(&layout.intermediates)?;
        fs::write(&layout.manifest, manifest.to_json()?).with_path(&layout.manifest)?;
        tracing::debug!("Wrote manifest {}", layout.manifest.display());

        self.state.manifest.set(manifest)
    }
}
