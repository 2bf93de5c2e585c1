//! `plugpack setup`: reports which external tools the workspace needs and
//! whether they are on `PATH`.

use super::common::{load_config, print_output};
use anyhow::Result;
use plugpack_core::cli::{ExitCode, OutputFormat};
use plugpack_core::{DeployConfig, ToolchainConfig, WorkspaceConfig};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// One external tool.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ToolStatus {
    /// What the tool is used for.
    pub role: &'static str,
    /// Program name.
    pub program: String,
    /// Resolved location, if found.
    pub path: Option<String>,
    /// Whether builds fail without it.
    pub required: bool,
}

/// Result of the setup command.
#[derive(Debug, Serialize)]
struct SetupResult {
    tools: Vec<ToolStatus>,
    ready: bool,
}

/// Lists the tools a workspace uses.
///
/// The translator is required when configured, the resource compiler when a
/// module requires resources. The analyzer and the deploy command are
/// optional: without them compatibility is not verified and deploying fails.
#[must_use]
pub fn required_tools(
    toolchain: &ToolchainConfig,
    deploy: &DeployConfig,
    needs_resources: bool,
) -> Vec<(&'static str, String, bool)> {
    let mut tools = Vec::new();
    if let Some(program) = toolchain.translator.as_ref().and_then(|c| c.first()) {
        tools.push(("translator", program.clone(), true));
    }
    tools.push(("analyzer", toolchain.analyzer.clone(), false));
    tools.push(("resource compiler", toolchain.resource_compiler.clone(), needs_resources));
    if let Some(program) = deploy.push.first() {
        tools.push(("deploy", program.clone(), false));
    }
    tools
}

/// Resolves every tool with `which`.
#[must_use]
pub fn probe(tools: Vec<(&'static str, String, bool)>) -> Vec<ToolStatus> {
    tools
        .into_iter()
        .map(|(role, program, required)| {
            let path = which::which(&program).ok().map(|p| p.display().to_string());
            ToolStatus {
                role,
                program,
                path,
                required,
            }
        })
        .collect()
}

/// Runs the setup command.
///
/// Uses the workspace configuration when it exists and the defaults
/// otherwise. Returns [`ExitCode::ERROR`] if a required tool is missing.
///
/// # Errors
///
/// Returns an error if an existing configuration is invalid.
pub async fn run(config_path: &Path, output_format: OutputFormat) -> Result<ExitCode> {
    let (toolchain, deploy, needs_resources) = if config_path.is_file() {
        let WorkspaceConfig {
            toolchain,
            deploy,
            modules,
            ..
        } = load_config(config_path)?;
        let needs_resources = modules.iter().any(|m| m.requires_resources);
        (toolchain, deploy, needs_resources)
    } else {
        warn!("{} not found, checking default tools", config_path.display());
        (ToolchainConfig::default(), DeployConfig::default(), false)
    };

    let tools = probe(required_tools(&toolchain, &deploy, needs_resources));
    for tool in tools.iter().filter(|t| t.path.is_none()) {
        if tool.required {
            warn!("Required {} '{}' is not on PATH", tool.role, tool.program);
        } else {
            warn!("Optional {} '{}' is not on PATH", tool.role, tool.program);
        }
    }

    let ready = tools.iter().all(|t| t.path.is_some() || !t.required);
    print_output(&SetupResult { tools, ready }, output_format)?;

    Ok(if ready { ExitCode::SUCCESS } else { ExitCode::ERROR })
}
