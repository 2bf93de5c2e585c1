//! `plugpack check`: standalone cross-platform compatibility check of an
//! archive.

use super::common::{load_config, print_output};
use anyhow::Result;
use plugpack_core::ToolchainConfig;
use plugpack_core::cli::{ExitCode, OutputFormat};
use plugpack_pipeline::stages::{CompatibilityVerdict, check_archive};
use plugpack_pipeline::tools::JdepsAnalyzer;
use serde::Serialize;
use std::path::Path;

/// Result of the check command.
#[derive(Debug, Serialize)]
struct CheckResult {
    /// Checked archive.
    archive: String,
    /// Analyzer program.
    analyzer: String,
    /// Forbidden namespace prefix.
    prefix: String,
    /// `clean`, `violation`, `inconclusive` or `analyzer-unavailable`.
    verdict: &'static str,
    /// Details for non-clean verdicts.
    detail: Option<String>,
}

/// Runs the analyzer on `archive`.
///
/// The toolchain comes from the workspace configuration when it exists,
/// otherwise from the defaults. `analyzer` overrides the configured program.
///
/// Returns [`ExitCode::BUILD_FAILED`] on a violation.
///
/// # Errors
///
/// Returns an error if the archive does not exist or the configuration is
/// invalid.
pub async fn run(
    archive: &Path,
    analyzer: Option<String>,
    config_path: &Path,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    let toolchain = if config_path.is_file() {
        load_config(config_path)?.toolchain
    } else {
        ToolchainConfig::default()
    };
    let program = analyzer.unwrap_or(toolchain.analyzer);
    let prefix = toolchain.platform_only_prefix;

    let module = archive
        .file_stem()
        .map_or_else(|| archive.display().to_string(), |s| s.to_string_lossy().into_owned());

    let (verdict, detail, code) = match check_archive(&JdepsAnalyzer::new(program.clone()), &module, archive, &prefix) {
        Ok(CompatibilityVerdict::Clean) => ("clean", None, ExitCode::SUCCESS),
        Ok(CompatibilityVerdict::Inconclusive) => (
            "inconclusive",
            Some("the analyzer printed nothing".to_string()),
            ExitCode::SUCCESS,
        ),
        Ok(CompatibilityVerdict::AnalyzerUnavailable { reason }) => {
            ("analyzer-unavailable", Some(reason), ExitCode::SUCCESS)
        }
        Err(e) if e.is_compatibility_violation() => (
            "violation",
            Some(e.remediation().unwrap_or_else(|| e.to_string())),
            ExitCode::BUILD_FAILED,
        ),
        Err(e) => return Err(e.into()),
    };

    print_output(
        &CheckResult {
            archive: archive.display().to_string(),
            analyzer: program,
            prefix,
            verdict,
            detail,
        },
        output_format,
    )?;
    Ok(code)
}
