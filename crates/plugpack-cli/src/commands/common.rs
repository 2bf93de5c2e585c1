//! Utilities shared across CLI commands.

use anyhow::{Context, Result};
use plugpack_core::cli::{ExitCode, OutputFormat};
use plugpack_core::{Error, WorkspaceConfig};
use serde::Serialize;
use std::path::Path;

/// Loads and validates the workspace configuration.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable or invalid.
///
/// # Examples
///
/// ```
/// use plugpack_cli::commands::common::load_config;
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("plugpack.toml");
/// std::fs::write(&path, "[[module]]\nname = \"Example\"\nclasses_dir = \"classes\"\n").unwrap();
///
/// let config = load_config(&path).unwrap();
/// assert_eq!(config.modules.len(), 1);
/// assert!(load_config(&dir.path().join("missing.toml")).is_err());
/// ```
pub fn load_config(path: &Path) -> Result<WorkspaceConfig> {
    WorkspaceConfig::load(path)
        .with_context(|| format!("failed to load workspace configuration {}", path.display()))
}

/// Prints `data` to stdout in the requested format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<()> {
    let formatted = crate::formatters::format_output(data, format)?;
    println!("{formatted}");
    Ok(())
}

/// Exit code for an error that aborted a command.
///
/// Configuration problems map to [`ExitCode::INVALID_INPUT`], everything
/// else to [`ExitCode::ERROR`].
#[must_use]
pub fn exit_code_for(error: &anyhow::Error) -> ExitCode {
    match error.downcast_ref::<Error>() {
        Some(e) if e.is_config_error() => ExitCode::INVALID_INPUT,
        _ => ExitCode::ERROR,
    }
}

/// Remediation hint of the first library error in the chain.
#[must_use]
pub fn hint_for(error: &anyhow::Error) -> Option<String> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .and_then(Error::remediation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_invalid_input() {
        let error = anyhow::Error::new(Error::ConfigError {
            message: "no modules".to_string(),
        });
        assert_eq!(exit_code_for(&error), ExitCode::INVALID_INPUT);
        assert!(hint_for(&error).is_some());
    }

    #[test]
    fn test_other_errors_are_general_failures() {
        let error = anyhow::anyhow!("boom");
        assert_eq!(exit_code_for(&error), ExitCode::ERROR);
        assert!(hint_for(&error).is_none());
    }

    #[test]
    fn test_context_keeps_config_error_visible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugpack.toml");
        std::fs::write(&path, "[workspace]\n").unwrap();

        let error = load_config(&path).unwrap_err();
        assert_eq!(exit_code_for(&error), ExitCode::INVALID_INPUT);
    }
}
