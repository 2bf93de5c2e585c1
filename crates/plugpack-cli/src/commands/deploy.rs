//! `plugpack deploy`: pushes a built package to a device.

use super::common::{load_config, print_output};
use anyhow::{Context, Result, bail};
use plugpack_core::cli::{ExitCode, OutputFormat};
use plugpack_pipeline::{CommandTransport, deploy_package};
use serde::Serialize;
use std::path::Path;

/// Result of the deploy command.
#[derive(Debug, Serialize)]
struct DeployResult {
    module: String,
    package: String,
    entry_class: Option<String>,
}

/// Deploys the package of `module` with the `[deploy]` commands.
///
/// # Errors
///
/// Returns an error if the module is unknown, was never built, or the
/// transport fails.
pub async fn run(module: &str, config_path: &Path, output_format: OutputFormat) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let Some(declared) = config.module(module) else {
        bail!("unknown module '{module}'");
    };

    let package = config.layout(&declared.name).package;
    if !package.is_file() {
        bail!(
            "{} has not been built yet; run `plugpack build --module {module}` first",
            package.display()
        );
    }

    let transport = CommandTransport::from_config(&config.deploy)?;
    let manifest = deploy_package(&transport, &package)
        .with_context(|| format!("failed to deploy {}", package.display()))?;

    print_output(
        &DeployResult {
            module: manifest.name,
            package: package.display().to_string(),
            entry_class: manifest.entry_class_name,
        },
        output_format,
    )?;
    Ok(ExitCode::SUCCESS)
}
