//! `compileResources`: compiles the module's platform resources.

use crate::tools::{ResourceCompiler, ResourceRequest};
use crate::{Fingerprinter, ModuleState, Stage};
use plugpack_core::{Error, IoResultExt, Result, ToolchainConfig};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Compiles the resource directory and manifest fragment into
/// `intermediates/res.apk`. Only wired for modules requiring resources.
pub struct ResourceStage {
    state: Arc<ModuleState>,
    toolchain: Arc<ToolchainConfig>,
    compiler: Arc<dyn ResourceCompiler>,
}

impl fmt::Debug for ResourceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceStage")
            .field("module", &self.state.name())
            .finish_non_exhaustive()
    }
}

impl ResourceStage {
    /// Stage name.
    pub const NAME: &'static str = "compileResources";

    /// Creates the stage.
    #[must_use]
    pub fn new(
        state: Arc<ModuleState>,
        toolchain: Arc<ToolchainConfig>,
        compiler: Arc<dyn ResourceCompiler>,
    ) -> Self {
        Self {
            state,
            toolchain,
            compiler,
        }
    }

    fn inputs(&self) -> Result<(&Path, &Path)> {
        let module = &self.state.module;
        match (&module.resource_dir, &module.manifest_fragment) {
            (Some(dir), Some(fragment)) => Ok((dir.as_path(), fragment.as_path())),
            _ => Err(Error::ConfigError {
                message: format!(
                    "module '{}' requires resources but lacks resource_dir or manifest_fragment",
                    module.name
                ),
            }),
        }
    }
}

impl Stage for ResourceStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn module(&self) -> Option<&str> {
        Some(self.state.name())
    }

    fn fingerprint(&self) -> Result<Option<String>> {
        let (dir, fragment) = self.inputs()?;
        let mut fp = Fingerprinter::new(Self::NAME);
        fp.path("resources", dir)?.path("fragment", fragment)?;
        for lib in &self.toolchain.boot_classpath {
            fp.path("boot", lib)?;
        }
        Ok(Some(fp.finish()))
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.state.layout.resources.clone()]
    }

    fn execute(&self) -> Result<()> {
        let (dir, fragment) = self.inputs()?;
        for input in [dir, fragment] {
            if !input.exists() {
                return Err(Error::MissingFile {
                    path: input.to_path_buf(),
                });
            }
        }

        let layout = &self.state.layout;
        if layout.resources.exists() {
            fs::remove_file(&layout.resources).with_path(&layout.resources)?;
        }
        self.compiler.compile(&ResourceRequest {
            resource_dir: dir,
            manifest_fragment: fragment,
            boot_classpath: &self.toolchain.boot_classpath,
            work_dir: &layout.intermediates,
            output: &layout.resources,
        })?;
        tracing::info!("Compiled resources of {}", self.state.name());
        Ok(())
    }
}
