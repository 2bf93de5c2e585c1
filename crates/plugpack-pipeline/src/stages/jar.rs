//! `compilePluginJar`: repackages the module's full archive as the plugin jar.

use crate::{Fingerprinter, ModuleState, Stage};
use plugpack_core::archive::{read_entries, write_archive};
use plugpack_core::{Error, IoResultExt, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Copies the full compiled archive into `<module>.jar` with sorted entries
/// and fixed timestamps, dropping platform-only classes for cross-platform
/// modules. Records the jar length in the `jar_size` cell.
#[derive(Debug)]
pub struct JarStage {
    state: Arc<ModuleState>,
    excluded_prefix: String,
}

impl JarStage {
    /// Stage name.
    pub const NAME: &'static str = "compilePluginJar";

    /// Creates the stage; `excluded_prefix` is an archive path prefix such as
    /// `android/`.
    #[must_use]
    pub fn new(state: Arc<ModuleState>, excluded_prefix: impl Into<String>) -> Self {
        Self {
            state,
            excluded_prefix: excluded_prefix.into(),
        }
    }

    fn source(&self) -> Result<&PathBuf> {
        self.state
            .module
            .full_archive
            .as_ref()
            .ok_or_else(|| Error::ConfigError {
                message: format!("module '{}' declares no full_archive", self.state.name()),
            })
    }
}

impl Stage for JarStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn module(&self) -> Option<&str> {
        Some(self.state.name())
    }

    fn fingerprint(&self) -> Result<Option<String>> {
        let mut fp = Fingerprinter::new(Self::NAME);
        fp.path("archive", self.source()?)?
            .flag("crossPlatform", self.state.module.is_cross_platform)
            .text("excluded", &self.excluded_prefix);
        Ok(Some(fp.finish()))
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.state.layout.jar.clone()]
    }

    fn restore(&self) -> Result<()> {
        let jar = &self.state.layout.jar;
        let size = fs::metadata(jar).with_path(jar)?.len();
        self.state.jar_size.set(size)
    }

    fn execute(&self) -> Result<()> {
        // The jar is only assembled once the entry point is known.
        let entry = self.state.entry_point.get()?;
        let source = self.source()?;
        let jar = &self.state.layout.jar;

        let mut entries = read_entries(source)?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let before = entries.len();
        if self.state.module.is_cross_platform {
            entries.retain(|e| !e.name.starts_with(&self.excluded_prefix));
        }
        if entries.len() < before {
            tracing::debug!(
                "Dropped {} platform-only entries from {}",
                before - entries.len(),
                self.state.name()
            );
        }

        write_archive(jar, &entries)?;
        let size = fs::metadata(jar).with_path(jar)?.len();
        tracing::info!(
            "Packaged plugin jar {} ({} bytes, entry point {})",
            jar.display(),
            size,
            entry
        );
        self.state.jar_size.set(size)
    }
}
