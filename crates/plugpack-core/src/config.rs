//! Workspace configuration (`plugpack.toml`).
//!
//! The configuration file declares the toolchain, the deploy transport, and
//! every plugin module of the workspace. Relative paths are resolved against
//! the directory containing the file.
//!
//! # Examples
//!
//! ```
//! use plugpack_core::WorkspaceConfig;
//! use std::path::Path;
//!
//! let config = WorkspaceConfig::from_toml_str(r#"
//!     [toolchain]
//!     analyzer = "jdeps"
//!
//!     [[module]]
//!     name = "ExampleProvider"
//!     classes_dir = "ExampleProvider/build/classes"
//! "#, Path::new("/work")).unwrap();
//!
//! assert_eq!(config.modules.len(), 1);
//! assert_eq!(config.build_dir(), Path::new("/work/build"));
//! assert_eq!(
//!     config.modules[0].classes_dir,
//!     Path::new("/work/ExampleProvider/build/classes")
//! );
//! ```

use crate::{Error, IoResultExt, Module, ModuleName, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "plugpack.toml";

/// Whole-workspace configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Workspace-wide settings.
    #[serde(default)]
    pub workspace: WorkspaceSettings,

    /// External tools and analysis settings.
    #[serde(default)]
    pub toolchain: ToolchainConfig,

    /// Deployment transport.
    #[serde(default)]
    pub deploy: DeployConfig,

    /// Plugin modules, in declaration order.
    #[serde(default, rename = "module")]
    pub modules: Vec<Module>,

    /// Directory the configuration was loaded from.
    #[serde(skip)]
    pub root: PathBuf,
}

/// Workspace-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    /// Output directory for packages, intermediates, and `plugins.json`.
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    /// Base URL packages are published under; registry `url` fields are
    /// `<base>/<name>.cs3`. Local archive paths are used when unset.
    #[serde(default)]
    pub download_base_url: Option<String>,

    /// Maximum number of stages running at once (defaults to available
    /// parallelism).
    #[serde(default)]
    pub max_parallel: Option<usize>,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            build_dir: default_build_dir(),
            download_base_url: None,
            max_parallel: None,
        }
    }
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

/// External tools used by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Platform boot classpath passed to the translator and resource compiler.
    #[serde(default)]
    pub boot_classpath: Vec<PathBuf>,

    /// Fully-qualified base types an entry class must extend or implement.
    #[serde(default = "default_plugin_base_types")]
    pub plugin_base_types: Vec<String>,

    /// Namespace prefix forbidden in cross-platform packages.
    #[serde(default = "default_platform_only_prefix")]
    pub platform_only_prefix: String,

    /// Static dependency analyzer program (invoked with
    /// `--print-module-deps <archive>`).
    #[serde(default = "default_analyzer")]
    pub analyzer: String,

    /// Bytecode translator command line; the built-in class archive is used
    /// when unset.
    #[serde(default)]
    pub translator: Option<Vec<String>>,

    /// Resource compiler program (`compile` and `link` subcommands).
    #[serde(default = "default_resource_compiler")]
    pub resource_compiler: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            boot_classpath: Vec::new(),
            plugin_base_types: default_plugin_base_types(),
            platform_only_prefix: default_platform_only_prefix(),
            analyzer: default_analyzer(),
            translator: None,
            resource_compiler: default_resource_compiler(),
        }
    }
}

impl ToolchainConfig {
    /// Archive path prefix of the platform-only namespace
    /// (`android.` becomes `android/`).
    #[must_use]
    pub fn platform_only_path_prefix(&self) -> String {
        self.platform_only_prefix.replace('.', "/")
    }
}

fn default_plugin_base_types() -> Vec<String> {
    vec![
        "com.lagradost.cloudstream3.plugins.Plugin".to_string(),
        "com.lagradost.cloudstream3.plugins.BasePlugin".to_string(),
    ]
}

fn default_platform_only_prefix() -> String {
    "android.".to_string()
}

fn default_analyzer() -> String {
    "jdeps".to_string()
}

fn default_resource_compiler() -> String {
    "aapt2".to_string()
}

/// Deployment transport command templates.
///
/// Placeholders: `{archive}`, `{file_name}`, `{entry_class}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Command pushing the package to the device.
    #[serde(default = "default_push")]
    pub push: Vec<String>,

    /// Optional command activating the pushed plugin.
    #[serde(default)]
    pub activate: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            push: default_push(),
            activate: Vec::new(),
        }
    }
}

fn default_push() -> Vec<String> {
    ["adb", "push", "{archive}", "/sdcard/Cloudstream3/plugins/"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl WorkspaceConfig {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).with_path(path)?;
        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        tracing::debug!("Loading workspace configuration from {}", path.display());
        Self::from_toml_str(&content, &root)
    }

    /// Parses and validates configuration text, resolving relative paths
    /// against `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for invalid TOML or invalid settings.
    pub fn from_toml_str(content: &str, root: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(|e| Error::ConfigError {
            message: format!("invalid plugpack.toml: {e}"),
        })?;
        config.root = root.to_path_buf();
        config.resolve_paths();
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self) {
        let root = self.root.clone();
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };

        resolve(&mut self.workspace.build_dir);
        self.toolchain.boot_classpath.iter_mut().for_each(resolve);

        for module in &mut self.modules {
            resolve(&mut module.classes_dir);
            module.classpath.iter_mut().for_each(resolve);
            for path in [
                &mut module.full_archive,
                &mut module.resource_dir,
                &mut module.manifest_fragment,
            ]
            .into_iter()
            .flatten()
            {
                resolve(path);
            }
        }
    }

    /// Validates the configuration before any stage runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if:
    /// - no plugin module is declared
    /// - two modules share a name
    /// - a cross-platform module has no `full_archive` to analyze
    /// - a module requiring resources lacks `resource_dir` or `manifest_fragment`
    /// - no plugin base type is configured
    /// - `max_parallel` is zero
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(Error::ConfigError { message });

        if self.modules.is_empty() {
            return fail("no plugin modules declared; add a [[module]] table".to_string());
        }

        if self.toolchain.plugin_base_types.is_empty()
            && self.modules.iter().any(|m| m.entry_class.is_none())
        {
            return fail("toolchain.plugin_base_types must not be empty".to_string());
        }

        if self.toolchain.platform_only_prefix.trim().is_empty() {
            return fail("toolchain.platform_only_prefix must not be empty".to_string());
        }

        if self.workspace.max_parallel == Some(0) {
            return fail("workspace.max_parallel must be greater than zero".to_string());
        }

        let mut seen = HashSet::new();
        for module in &self.modules {
            if !seen.insert(module.name.as_str()) {
                return fail(format!("module '{}' is declared twice", module.name));
            }

            if module.is_cross_platform && module.full_archive.is_none() {
                return fail(format!(
                    "module '{}' is cross-platform but declares no full_archive to analyze",
                    module.name
                ));
            }

            if module.requires_resources
                && (module.resource_dir.is_none() || module.manifest_fragment.is_none())
            {
                return fail(format!(
                    "module '{}' requires resources but lacks resource_dir or manifest_fragment",
                    module.name
                ));
            }

            if module.version.trim().is_empty() {
                return fail(format!("module '{}' has an empty version", module.name));
            }
        }

        Ok(())
    }

    /// Absolute build directory.
    #[must_use]
    pub fn build_dir(&self) -> &Path {
        &self.workspace.build_dir
    }

    /// Path of the registry catalog.
    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.build_dir().join("plugins.json")
    }

    /// Path of the stage fingerprint cache.
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.build_dir().join(".plugpack-cache.json")
    }

    /// Output layout of a module.
    #[must_use]
    pub fn layout(&self, module: &ModuleName) -> ModuleLayout {
        ModuleLayout::new(self.build_dir(), module)
    }

    /// Looks up a module by name.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name.as_str() == name)
    }

    /// Stage parallelism.
    #[must_use]
    pub fn max_parallel(&self) -> usize {
        self.workspace.max_parallel.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        })
    }
}

/// Output file layout of one module under the build directory.
///
/// ```text
/// build/
/// ├── plugins.json
/// └── ExampleProvider/
///     ├── ExampleProvider.cs3
///     ├── ExampleProvider.jar
///     └── intermediates/
///         ├── classes.dex
///         ├── pluginClass
///         ├── manifest.json
///         └── res.apk
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLayout {
    /// Module output directory.
    pub dir: PathBuf,
    /// Intermediate outputs directory.
    pub intermediates: PathBuf,
    /// Final plugin package (`<name>.cs3`).
    pub package: PathBuf,
    /// Packaged plugin jar (`<name>.jar`).
    pub jar: PathBuf,
    /// Translated bytecode bundle.
    pub bundle: PathBuf,
    /// Persisted discovered entry point.
    pub plugin_class: PathBuf,
    /// Written manifest document.
    pub manifest: PathBuf,
    /// Compiled resource archive.
    pub resources: PathBuf,
}

impl ModuleLayout {
    /// Computes the layout for `module` under `build_dir`.
    #[must_use]
    pub fn new(build_dir: &Path, module: &ModuleName) -> Self {
        let dir = build_dir.join(module.as_str());
        let intermediates = dir.join("intermediates");
        Self {
            package: dir.join(format!("{module}.cs3")),
            jar: dir.join(format!("{module}.jar")),
            bundle: intermediates.join("classes.dex"),
            plugin_class: intermediates.join("pluginClass"),
            manifest: intermediates.join("manifest.json"),
            resources: intermediates.join("res.apk"),
            intermediates,
            dir,
        }
    }
}
