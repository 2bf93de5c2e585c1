//! `makePluginsJson`: the workspace-wide registry barrier.

use crate::{Freshness, ModuleState, Stage};
use plugpack_core::Result;
use plugpack_registry::Registry;
use std::path::PathBuf;
use std::sync::Arc;

/// Collects every packaged module into `plugins.json`.
///
/// Wired with ordering-only edges after every module's `make` stage, so it
/// runs even when some modules failed; those are left out.
#[derive(Debug)]
pub struct RegistryStage {
    states: Vec<Arc<ModuleState>>,
    output: PathBuf,
    base_url: Option<String>,
}

impl RegistryStage {
    /// Stage name.
    pub const NAME: &'static str = "makePluginsJson";

    /// Creates the stage over `states` in declaration order.
    #[must_use]
    pub const fn new(states: Vec<Arc<ModuleState>>, output: PathBuf, base_url: Option<String>) -> Self {
        Self {
            states,
            output,
            base_url,
        }
    }
}

impl Stage for RegistryStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn freshness(&self) -> Freshness {
        Freshness::AlwaysStale
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.output.clone()]
    }

    fn execute(&self) -> Result<()> {
        let registry = Registry::aggregate(
            self.states.iter().map(|s| s.package_record()),
            self.base_url.as_deref(),
        );
        registry.write(&self.output)
    }
}
