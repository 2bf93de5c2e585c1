//! `plugpack build`: builds plugin packages and the registry.

use super::common::{load_config, print_output};
use anyhow::{Context, Result};
use plugpack_core::cli::{ExitCode, OutputFormat};
use plugpack_pipeline::{BuildOptions, BuildOutcome, Orchestrator, TaskOutcome};
use serde::Serialize;
use std::path::Path;
use tracing::{error, info};

/// Result of a build.
#[derive(Debug, Serialize)]
pub struct BuildSummary {
    /// Every selected module.
    pub modules: Vec<ModuleSummary>,
    /// Stages that failed.
    pub failures: Vec<StageFailure>,
    /// Written registry, when the build covered the whole workspace.
    pub registry: Option<String>,
    /// Stages that ran.
    pub executed: usize,
    /// Stages skipped as up-to-date.
    pub up_to_date: usize,
}

/// Outcome of one module.
#[derive(Debug, Serialize)]
pub struct ModuleSummary {
    /// Module name.
    pub name: String,
    /// Whether the package was written.
    pub packaged: bool,
    /// Package path.
    pub package: Option<String>,
    /// Package length in bytes.
    pub file_size: Option<u64>,
    /// Discovered or configured entry class.
    pub entry_class: Option<String>,
}

/// A failed stage.
#[derive(Debug, Serialize)]
pub struct StageFailure {
    /// Owning module, if any.
    pub module: Option<String>,
    /// Stage name.
    pub stage: String,
    /// Error message.
    pub message: String,
    /// How to fix it.
    pub hint: Option<String>,
}

impl BuildSummary {
    /// Summarizes a finished build.
    #[must_use]
    pub fn from_outcome(outcome: &BuildOutcome) -> Self {
        let modules = outcome
            .modules
            .iter()
            .map(|state| {
                let packaged = state.packaged.try_get();
                ModuleSummary {
                    name: state.name().to_string(),
                    packaged: packaged.is_some(),
                    package: packaged.map(|p| p.path.display().to_string()),
                    file_size: packaged.map(|p| p.file_size),
                    entry_class: state.entry_point.try_get().cloned(),
                }
            })
            .collect();

        let failures = outcome
            .report
            .tasks()
            .iter()
            .filter_map(|task| match &task.outcome {
                TaskOutcome::Failed { error } => Some(StageFailure {
                    module: task.module.clone(),
                    stage: task.stage.to_string(),
                    message: error.to_string(),
                    hint: error.remediation(),
                }),
                _ => None,
            })
            .collect();

        Self {
            modules,
            failures,
            registry: outcome
                .registry
                .as_ref()
                .filter(|_| outcome.report.task("makePluginsJson").is_some_and(|t| t.outcome.is_complete()))
                .map(|p| p.display().to_string()),
            executed: outcome.report.count("succeeded") + outcome.report.count("failed"),
            up_to_date: outcome.report.count("up-to-date"),
        }
    }
}

/// Runs the build command.
///
/// Builds the selected modules (all of them when `modules` is empty) and
/// prints a summary. Stage failures are reported with their remediation hint.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the stage graph
/// cannot be executed.
///
/// # Examples
///
/// ```no_run
/// use plugpack_cli::commands::build;
/// use plugpack_core::cli::{ExitCode, OutputFormat};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let code = build::run(Path::new("plugpack.toml"), Vec::new(), false, OutputFormat::Pretty).await?;
/// assert_eq!(code, ExitCode::SUCCESS);
/// # Ok(())
/// # }
/// ```
pub async fn run(
    config_path: &Path,
    modules: Vec<String>,
    no_cache: bool,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    info!(
        "Building {} in {}",
        if modules.is_empty() {
            format!("{} module(s)", config.modules.len())
        } else {
            modules.join(", ")
        },
        config.build_dir().display()
    );

    let orchestrator = Orchestrator::from_config(config).context("invalid toolchain configuration")?;
    let outcome = orchestrator.build(&BuildOptions { modules, no_cache }).await?;

    let summary = BuildSummary::from_outcome(&outcome);
    for failure in &summary.failures {
        error!(
            "{}:{} failed: {}",
            failure.module.as_deref().unwrap_or("workspace"),
            failure.stage,
            failure.message
        );
        if let Some(hint) = &failure.hint {
            error!("hint: {}", hint);
        }
    }
    print_output(&summary, output_format)?;

    if outcome.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::BUILD_FAILED)
    }
}
