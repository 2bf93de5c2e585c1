//! `plugpack clean`: removes the build directory.

use super::common::{load_config, print_output};
use anyhow::{Context, Result};
use plugpack_core::cli::{ExitCode, OutputFormat};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Serialize)]
struct CleanResult {
    build_dir: String,
    removed: bool,
}

/// Deletes the build directory with every package, intermediate, registry
/// and the fingerprint cache.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the directory cannot
/// be removed.
pub async fn run(config_path: &Path, output_format: OutputFormat) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let build_dir = config.build_dir();

    let removed = build_dir.exists();
    if removed {
        fs::remove_dir_all(build_dir)
            .with_context(|| format!("failed to remove {}", build_dir.display()))?;
        info!("Removed {}", build_dir.display());
    }

    print_output(
        &CleanResult {
            build_dir: build_dir.display().to_string(),
            removed,
        },
        output_format,
    )?;
    Ok(ExitCode::SUCCESS)
}
