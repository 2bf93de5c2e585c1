//! Wires every module's stages into one graph and runs it.

use crate::stages::{
    CompatStage, CompileStage, JarStage, ManifestStage, PackageStage, RegistryStage, ResourceStage,
};
use crate::{BuildReport, DependencyKind, FingerprintCache, ModuleState, TaskGraph, TaskId, Toolset};
use plugpack_core::{Error, Result, WorkspaceConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// What to build.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Restrict the build to these modules. Empty builds every module and
    /// the registry; a non-empty selection does not write the registry.
    pub modules: Vec<String>,
    /// Ignore recorded fingerprints so every stage runs.
    pub no_cache: bool,
}

/// Result of a build.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Per-stage outcomes.
    pub report: BuildReport,
    /// State of every built module, in declaration order.
    pub modules: Vec<Arc<ModuleState>>,
    /// Path of `plugins.json` when the registry stage was wired.
    pub registry: Option<PathBuf>,
}

impl BuildOutcome {
    /// Returns `true` if every stage succeeded or was up-to-date.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }

    /// Modules that reached the packaged state.
    pub fn packaged(&self) -> impl Iterator<Item = &ModuleState> {
        self.modules.iter().map(AsRef::as_ref).filter(|m| m.is_packaged())
    }
}

/// A wired graph, ready to execute.
#[derive(Debug)]
pub struct BuildPlan {
    /// Stage graph.
    pub graph: TaskGraph,
    /// Per-module state shared by the stages.
    pub modules: Vec<Arc<ModuleState>>,
    /// Path of `plugins.json` when the registry stage was wired.
    pub registry: Option<PathBuf>,
}

/// Task ids of one module's stages.
#[derive(Debug, Clone, Copy)]
struct ModuleTasks {
    package: TaskId,
}

/// Builds plugin packages for a workspace.
///
/// # Examples
///
/// ```no_run
/// use plugpack_core::WorkspaceConfig;
/// use plugpack_pipeline::{BuildOptions, Orchestrator};
///
/// # #[tokio::main]
/// # async fn main() -> plugpack_core::Result<()> {
/// let config = WorkspaceConfig::load("plugpack.toml")?;
/// let orchestrator = Orchestrator::from_config(config)?;
/// let outcome = orchestrator.build(&BuildOptions::default()).await?;
///
/// for module in outcome.packaged() {
///     println!("built {}", module.name());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Orchestrator {
    config: WorkspaceConfig,
    toolchain: Arc<plugpack_core::ToolchainConfig>,
    tools: Toolset,
}

impl Orchestrator {
    /// Creates an orchestrator with explicit tools.
    #[must_use]
    pub fn new(config: WorkspaceConfig, tools: Toolset) -> Self {
        let toolchain = Arc::new(config.toolchain.clone());
        Self {
            config,
            toolchain,
            tools,
        }
    }

    /// Creates an orchestrator with the tools named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the toolchain is misconfigured.
    pub fn from_config(config: WorkspaceConfig) -> Result<Self> {
        let tools = Toolset::from_config(&config.toolchain)?;
        Ok(Self::new(config, tools))
    }

    /// Workspace configuration.
    #[must_use]
    pub const fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Wires the stage graph.
    ///
    /// Per module: `compileDex`, then `compilePluginJar` and
    /// `ensureJarCompatibility` when the module has a full archive,
    /// `compileResources` when it requires resources, then `writeManifest`
    /// and `make`. `makePluginsJson` follows every `make` through ordering
    /// edges when no module filter is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for an unknown module in the filter.
    pub fn plan(&self, options: &BuildOptions) -> Result<BuildPlan> {
        for name in &options.modules {
            if self.config.module(name).is_none() {
                return Err(Error::ConfigError {
                    message: format!("unknown module '{name}'"),
                });
            }
        }

        let selected = self
            .config
            .modules
            .iter()
            .filter(|m| options.modules.is_empty() || options.modules.iter().any(|n| n == m.name.as_str()));

        let mut graph = TaskGraph::new();
        let mut states = Vec::new();
        let mut packages = Vec::new();
        for module in selected {
            let layout = self.config.layout(&module.name);
            let state = Arc::new(ModuleState::new(module.clone(), layout));
            let tasks = self.wire_module(&mut graph, &state);
            packages.push(tasks.package);
            states.push(state);
        }

        let registry = if options.modules.is_empty() {
            let path = self.config.registry_path();
            let registry = graph.submit(
                RegistryStage::new(
                    states.clone(),
                    path.clone(),
                    self.config.workspace.download_base_url.clone(),
                ),
                &[],
            );
            for package in packages {
                graph.depend_on(registry, package, DependencyKind::Ordering)?;
            }
            Some(path)
        } else {
            None
        };

        tracing::debug!("Planned {} stage(s) for {} module(s)", graph.len(), states.len());
        Ok(BuildPlan {
            graph,
            modules: states,
            registry,
        })
    }

    fn wire_module(&self, graph: &mut TaskGraph, state: &Arc<ModuleState>) -> ModuleTasks {
        let module = &state.module;

        let compile = graph.submit(
            CompileStage::new(
                Arc::clone(state),
                Arc::clone(&self.toolchain),
                Arc::clone(&self.tools.translator),
            ),
            &[],
        );

        let mut manifest_deps = vec![compile];
        if module.packages_jar() {
            let jar = graph.submit(
                JarStage::new(Arc::clone(state), self.toolchain.platform_only_path_prefix()),
                &[compile],
            );
            let compat = graph.submit(
                CompatStage::new(
                    Arc::clone(state),
                    Arc::clone(&self.tools.analyzer),
                    self.toolchain.platform_only_prefix.clone(),
                ),
                &[jar],
            );
            manifest_deps.extend([jar, compat]);
        }

        let mut package_deps = vec![compile];
        if module.requires_resources {
            let resources = graph.submit(
                ResourceStage::new(
                    Arc::clone(state),
                    Arc::clone(&self.toolchain),
                    Arc::clone(&self.tools.resources),
                ),
                &[compile],
            );
            manifest_deps.push(resources);
            package_deps.push(resources);
        }

        let manifest = graph.submit(ManifestStage::new(Arc::clone(state)), &manifest_deps);
        package_deps.insert(0, manifest);
        let package = graph.submit(PackageStage::new(Arc::clone(state)), &package_deps);

        ModuleTasks { package }
    }

    /// Plans and runs a build, persisting stage fingerprints afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error for planning problems or a graph cycle. Stage
    /// failures are reported in [`BuildOutcome::report`].
    pub async fn build(&self, options: &BuildOptions) -> Result<BuildOutcome> {
        let BuildPlan {
            graph,
            modules,
            registry,
        } = self.plan(options)?;

        let cache_path = self.config.cache_path();
        let mut cache = if options.no_cache {
            FingerprintCache::empty(cache_path)
        } else {
            FingerprintCache::load(cache_path)
        };

        let report = graph.execute(self.config.max_parallel(), &mut cache).await?;
        if let Err(e) = cache.save() {
            tracing::warn!("Failed to save fingerprint cache: {}", e);
        }

        tracing::info!(
            "Build finished: {} succeeded, {} up-to-date, {} failed, {} skipped",
            report.count("succeeded"),
            report.count("up-to-date"),
            report.count("failed"),
            report.count("skipped")
        );

        Ok(BuildOutcome {
            report,
            modules,
            registry,
        })
    }
}
