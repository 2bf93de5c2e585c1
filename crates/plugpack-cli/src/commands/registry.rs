//! `plugpack registry`: rewrites `plugins.json` from packages already built.

use super::common::{load_config, print_output};
use anyhow::{Context, Result};
use plugpack_core::archive::read_entry;
use plugpack_core::cli::{ExitCode, OutputFormat};
use plugpack_core::{PackageManifest, WorkspaceConfig};
use plugpack_pipeline::stages::MANIFEST_ENTRY;
use plugpack_registry::{PackageRecord, Registry};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Result of the registry command.
#[derive(Debug, Serialize)]
struct RegistryResult {
    /// Written registry path.
    registry: String,
    /// Modules in the registry.
    modules: Vec<String>,
    /// Modules without a package.
    missing: Vec<String>,
}

/// Reads the record of a built package; `None` if it was never built.
fn package_record(config: &WorkspaceConfig, module: &plugpack_core::Module) -> Result<Option<PackageRecord>> {
    let package = config.layout(&module.name).package;
    if !package.is_file() {
        warn!("{} has no package at {}", module.name, package.display());
        return Ok(None);
    }

    let bytes = read_entry(&package, MANIFEST_ENTRY)?;
    let manifest = PackageManifest::from_json(&String::from_utf8_lossy(&bytes))
        .with_context(|| format!("invalid manifest in {}", package.display()))?;
    let file_size = fs::metadata(&package)
        .with_context(|| format!("failed to stat {}", package.display()))?
        .len();

    Ok(Some(PackageRecord {
        manifest,
        archive_path: package,
        file_size,
    }))
}

/// Runs the registry command without rebuilding anything.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a package is corrupt,
/// or the registry cannot be written.
pub async fn run(config_path: &Path, output_format: OutputFormat) -> Result<ExitCode> {
    let config = load_config(config_path)?;

    let mut records = Vec::with_capacity(config.modules.len());
    let mut missing = Vec::new();
    for module in &config.modules {
        let record = package_record(&config, module)?;
        if record.is_none() {
            missing.push(module.name.to_string());
        }
        records.push(record);
    }

    let registry = Registry::aggregate(records, config.workspace.download_base_url.as_deref());
    let path = config.registry_path();
    registry.write(&path)?;
    info!("Registry lists {} of {} module(s)", registry.len(), config.modules.len());

    print_output(
        &RegistryResult {
            registry: path.display().to_string(),
            modules: registry.entries().iter().map(|e| e.name().to_string()).collect(),
            missing,
        },
        output_format,
    )?;

    Ok(ExitCode::SUCCESS)
}
