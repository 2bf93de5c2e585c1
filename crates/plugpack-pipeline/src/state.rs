//! Per-module runtime state shared between stages.

use plugpack_core::{DeferredCell, Module, ModuleLayout, PackageManifest};
use plugpack_registry::PackageRecord;
use std::path::PathBuf;

/// The finished package of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedArtifact {
    /// Package path (`<build>/<module>/<module>.cs3`).
    pub path: PathBuf,
    /// Package length in bytes.
    pub file_size: u64,
}

/// Values discovered while one module is built.
///
/// Every cell has exactly one writer stage; readers depend on that stage in
/// the graph.
///
/// | cell          | writer                 | readers                   |
/// |---------------|------------------------|---------------------------|
/// | `entry_point` | `compileDex`           | jar, manifest, package    |
/// | `jar_size`    | `compilePluginJar`     | manifest                  |
/// | `manifest`    | `writeManifest`        | package, registry         |
/// | `packaged`    | `make`                 | registry                  |
#[derive(Debug)]
pub struct ModuleState {
    /// Module configuration.
    pub module: Module,
    /// Output layout under the build directory.
    pub layout: ModuleLayout,
    /// Fully-qualified entry class.
    pub entry_point: DeferredCell<String>,
    /// Length of the packaged plugin jar.
    pub jar_size: DeferredCell<u64>,
    /// Finalized manifest.
    pub manifest: DeferredCell<PackageManifest>,
    /// Written package.
    pub packaged: DeferredCell<PackagedArtifact>,
}

impl ModuleState {
    /// Creates the state of a module with every cell unresolved.
    #[must_use]
    pub const fn new(module: Module, layout: ModuleLayout) -> Self {
        Self {
            module,
            layout,
            entry_point: DeferredCell::new("entryPoint"),
            jar_size: DeferredCell::new("jarSize"),
            manifest: DeferredCell::new("manifest"),
            packaged: DeferredCell::new("packaged"),
        }
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.module.name.as_str()
    }

    /// Returns `true` once the package has been written.
    #[must_use]
    pub fn is_packaged(&self) -> bool {
        self.packaged.is_resolved()
    }

    /// Registry input for this module, or `None` if it never reached the
    /// packaged state.
    #[must_use]
    pub fn package_record(&self) -> Option<PackageRecord> {
        let artifact = self.packaged.try_get()?;
        let manifest = self.manifest.try_get()?;
        Some(PackageRecord {
            manifest: manifest.clone(),
            archive_path: artifact.path.clone(),
            file_size: artifact.file_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugpack_core::ModuleName;
    use std::path::Path;

    fn state() -> ModuleState {
        let name = ModuleName::new("Example").unwrap();
        let layout = ModuleLayout::new(Path::new("/build"), &name);
        ModuleState::new(Module::new(name, "classes"), layout)
    }

    #[test]
    fn test_new_state_is_unresolved() {
        let state = state();
        assert_eq!(state.name(), "Example");
        assert!(!state.is_packaged());
        assert!(state.package_record().is_none());
        assert!(state.entry_point.get().unwrap_err().is_unresolved_cell());
    }

    #[test]
    fn test_package_record_after_packaging() {
        let state = state();
        let manifest = PackageManifest::from_module(&state.module).finalize("a.B", None);
        state.manifest.set(manifest.clone()).unwrap();
        state
            .packaged
            .set(PackagedArtifact {
                path: state.layout.package.clone(),
                file_size: 99,
            })
            .unwrap();

        let record = state.package_record().unwrap();
        assert_eq!(record.manifest, manifest);
        assert_eq!(record.file_size, 99);
        assert_eq!(record.archive_path, Path::new("/build/Example/Example.cs3"));
    }
}
