//! Pushing a built package to a device.

use crate::stages::MANIFEST_ENTRY;
use plugpack_core::archive::read_entry;
use plugpack_core::{DeployConfig, Error, PackageManifest, Result};
use std::path::Path;
use std::process::Command;

/// Moves a package onto a device and activates it.
pub trait DeployTransport {
    /// Deploys `archive`, whose plugin class is `entry_class`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolFailed`] if the transport fails.
    fn deploy(&self, archive: &Path, entry_class: &str) -> Result<()>;
}

/// Runs the configured `push` and `activate` command templates.
#[derive(Debug, Clone)]
pub struct CommandTransport {
    push: Vec<String>,
    activate: Vec<String>,
}

impl CommandTransport {
    /// Creates a transport from the `[deploy]` table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the push command is empty.
    pub fn from_config(config: &DeployConfig) -> Result<Self> {
        if config.push.is_empty() {
            return Err(Error::ConfigError {
                message: "deploy.push must name a command".to_string(),
            });
        }
        Ok(Self {
            push: config.push.clone(),
            activate: config.activate.clone(),
        })
    }

    fn expand(template: &[String], archive: &Path, entry_class: &str) -> Vec<String> {
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let archive = archive.display().to_string();
        template
            .iter()
            .map(|arg| {
                arg.replace("{archive}", &archive)
                    .replace("{file_name}", &file_name)
                    .replace("{entry_class}", entry_class)
            })
            .collect()
    }

    fn run(argv: &[String]) -> Result<()> {
        let Some((program, args)) = argv.split_first() else {
            return Ok(());
        };
        tracing::info!("Running {}", argv.join(" "));
        let output = Command::new(program).args(args).output().map_err(|e| Error::ToolFailed {
            tool: program.clone(),
            message: format!("failed to launch: {e}"),
        })?;
        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool: program.clone(),
                message: format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

impl DeployTransport for CommandTransport {
    fn deploy(&self, archive: &Path, entry_class: &str) -> Result<()> {
        Self::run(&Self::expand(&self.push, archive, entry_class))?;
        Self::run(&Self::expand(&self.activate, archive, entry_class))
    }
}

/// Deploys a built package, reading its entry class from the embedded
/// manifest.
///
/// # Errors
///
/// Returns [`Error::MissingFile`] if the package or its manifest is missing,
/// a serialization error if the manifest has no entry class, or the
/// transport's error.
pub fn deploy_package(transport: &dyn DeployTransport, archive: &Path) -> Result<PackageManifest> {
    let bytes = read_entry(archive, MANIFEST_ENTRY)?;
    let manifest = PackageManifest::from_json(&String::from_utf8_lossy(&bytes))?;
    let entry_class = manifest
        .entry_class_name
        .as_deref()
        .ok_or_else(|| Error::SerializationError {
            message: format!("{} in {} has no entryClassName", MANIFEST_ENTRY, archive.display()),
            source: None,
        })?;

    transport.deploy(archive, entry_class)?;
    tracing::info!("Deployed {} ({})", manifest.name, entry_class);
    Ok(manifest)
}
