//! `ensureJarCompatibility`: static check that a cross-platform jar does not
//! reference platform-only packages.

use crate::tools::DependencyAnalyzer;
use crate::{Freshness, ModuleState, Stage};
use plugpack_core::{Error, Result};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// What the analyzer said about an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompatibilityVerdict {
    /// No platform-only dependency was reported.
    Clean,
    /// The analyzer printed nothing, so nothing could be verified.
    Inconclusive,
    /// The analyzer could not be launched.
    AnalyzerUnavailable {
        /// Launch error
        reason: String,
    },
}

/// Runs the analyzer on `archive` and judges its output.
///
/// Advisory problems (launch failure, empty output) are logged as warnings
/// and returned as verdicts; only a reference to `prefix` is an error.
///
/// # Errors
///
/// Returns [`Error::MissingFile`] if `archive` does not exist, or
/// [`Error::CompatibilityViolation`] if the analyzer output contains
/// `prefix`.
pub fn check_archive(
    analyzer: &dyn DependencyAnalyzer,
    module: &str,
    archive: &Path,
    prefix: &str,
) -> Result<CompatibilityVerdict> {
    if !archive.is_file() {
        return Err(Error::MissingFile {
            path: archive.to_path_buf(),
        });
    }

    let output = match analyzer.print_module_deps(archive) {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(
                "Failed to run the dependency analyzer for {}: {}. Cross-platform compatibility is not verified.",
                module,
                e
            );
            return Ok(CompatibilityVerdict::AnalyzerUnavailable {
                reason: e.to_string(),
            });
        }
    };

    let output = output.trim();
    if output.is_empty() {
        tracing::warn!(
            "The dependency analyzer printed nothing for {}; cannot analyze {}",
            module,
            archive.display()
        );
        return Ok(CompatibilityVerdict::Inconclusive);
    }

    if output.contains(prefix) {
        return Err(Error::CompatibilityViolation {
            module: module.to_string(),
            prefix: prefix.to_string(),
        });
    }

    tracing::info!("{} is cross-platform compatible", module);
    Ok(CompatibilityVerdict::Clean)
}

/// Validates the plugin jar of a cross-platform module. A no-op for modules
/// that are not cross-platform.
///
/// Runs on every build: an advisory verdict must not be cached as a pass.
pub struct CompatStage {
    state: Arc<ModuleState>,
    analyzer: Arc<dyn DependencyAnalyzer>,
    prefix: String,
}

impl fmt::Debug for CompatStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompatStage")
            .field("module", &self.state.name())
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl CompatStage {
    /// Stage name.
    pub const NAME: &'static str = "ensureJarCompatibility";

    /// Creates the stage; `prefix` is the dotted platform-only namespace
    /// (`android.`).
    #[must_use]
    pub fn new(state: Arc<ModuleState>, analyzer: Arc<dyn DependencyAnalyzer>, prefix: impl Into<String>) -> Self {
        Self {
            state,
            analyzer,
            prefix: prefix.into(),
        }
    }
}

impl Stage for CompatStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn module(&self) -> Option<&str> {
        Some(self.state.name())
    }

    fn freshness(&self) -> Freshness {
        Freshness::AlwaysStale
    }

    fn execute(&self) -> Result<()> {
        if !self.state.module.is_cross_platform {
            tracing::debug!("{} is not cross-platform, skipping compatibility check", self.state.name());
            return Ok(());
        }
        check_archive(
            self.analyzer.as_ref(),
            self.state.name(),
            &self.state.layout.jar,
            &self.prefix,
        )
        .map(|_| ())
    }
}
