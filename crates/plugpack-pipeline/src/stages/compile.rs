//! `compileDex`: entry-point discovery and bytecode translation.

use crate::{Fingerprinter, ModuleState, Stage};
use plugpack_bytecode::{BundleTranslator, TranslateRequest, resolve_entry_point};
use plugpack_core::{Error, IoResultExt, Result, ToolchainConfig};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Resolves the module's entry point and translates its classes into the
/// bytecode bundle.
///
/// The entry point is persisted to `intermediates/pluginClass` so that an
/// up-to-date skip can restore the `entry_point` cell.
#[derive(Debug)]
pub struct CompileStage {
    state: Arc<ModuleState>,
    toolchain: Arc<ToolchainConfig>,
    translator: Arc<dyn BundleTranslator>,
}

impl CompileStage {
    /// Stage name.
    pub const NAME: &'static str = "compileDex";

    /// Creates the stage.
    #[must_use]
    pub fn new(
        state: Arc<ModuleState>,
        toolchain: Arc<ToolchainConfig>,
        translator: Arc<dyn BundleTranslator>,
    ) -> Self {
        Self {
            state,
            toolchain,
            translator,
        }
    }
}

impl Stage for CompileStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn module(&self) -> Option<&str> {
        Some(self.state.name())
    }

    fn fingerprint(&self) -> Result<Option<String>> {
        let module = &self.state.module;
        let mut fp = Fingerprinter::new(Self::NAME);
        fp.path("classes", &module.classes_dir)?;
        for root in &module.classpath {
            fp.path("classpath", root)?;
        }
        for lib in &self.toolchain.boot_classpath {
            fp.path("boot", lib)?;
        }
        for base in &self.toolchain.plugin_base_types {
            fp.text("base", base);
        }
        fp.text("override", module.entry_class.as_deref().unwrap_or_default())
            .number("minPlatformVersion", u64::from(module.min_platform_version))
            .text("translator", self.translator.name());
        for arg in self.translator.command_line() {
            fp.text("translatorArg", arg);
        }
        Ok(Some(fp.finish()))
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![
            self.state.layout.bundle.clone(),
            self.state.layout.plugin_class.clone(),
        ]
    }

    fn restore(&self) -> Result<()> {
        let path = &self.state.layout.plugin_class;
        let entry = fs::read_to_string(path).with_path(path)?;
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(Error::MissingFile { path: path.clone() });
        }
        self.state.entry_point.set(entry.to_string())
    }

    fn execute(&self) -> Result<()> {
        let module = &self.state.module;
        let layout = &self.state.layout;

        let entry = resolve_entry_point(
            module.entry_class.as_deref(),
            module.name.as_str(),
            &module.classes_dir,
            &module.classpath,
            &self.toolchain.plugin_base_types,
        )?;

        self.translator.translate(&TranslateRequest {
            classes_dir: &module.classes_dir,
            min_platform_version: module.min_platform_version,
            boot_classpath: &self.toolchain.boot_classpath,
            output: &layout.bundle,
        })?;

        fs::create_dir_all(&layout.intermediates).with_path(&layout.intermediates)?;
        fs::write(&layout.plugin_class, entry.as_str()).with_path(&layout.plugin_class)?;
        tracing::info!(
            "Compiled {} with {} (entry point {})",
            module.name,
            self.translator.name(),
            entry
        );
        self.state.entry_point.set(entry.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugpack_bytecode::{ClassArchiveTranslator, ExternalTranslator};
    use plugpack_core::{Module, ModuleLayout, ModuleName};

    fn stage(dir: &std::path::Path, translator: Arc<dyn BundleTranslator>) -> CompileStage {
        let name = ModuleName::new("Example").unwrap();
        let layout = ModuleLayout::new(&dir.join("build"), &name);
        let state = Arc::new(ModuleState::new(Module::new(name, dir.join("classes")), layout));
        let toolchain = ToolchainConfig {
            boot_classpath: vec![dir.join("android.jar")],
            ..ToolchainConfig::default()
        };
        CompileStage::new(state, Arc::new(toolchain), translator)
    }

    #[test]
    fn test_fingerprint_tracks_boot_classpath_content() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("android.jar"), b"api 21").unwrap();
        let compile = stage(dir.path(), Arc::new(ClassArchiveTranslator));
        let before = compile.fingerprint().unwrap();

        fs::write(dir.path().join("android.jar"), b"api 34").unwrap();
        assert_ne!(compile.fingerprint().unwrap(), before);
    }

    #[test]
    fn test_fingerprint_tracks_translator_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let debug = ExternalTranslator::new(vec!["d8".to_string(), "--debug".to_string()]).unwrap();
        let release = ExternalTranslator::new(vec!["d8".to_string(), "--release".to_string()]).unwrap();

        assert_ne!(
            stage(dir.path(), Arc::new(debug)).fingerprint().unwrap(),
            stage(dir.path(), Arc::new(release)).fingerprint().unwrap()
        );
    }
}
