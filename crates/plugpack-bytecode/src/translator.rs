//! Bytecode bundle translation.
//!
//! The package carries one bytecode bundle (`classes.dex`). When a platform
//! translator is configured it is invoked as an external command; otherwise
//! the class files themselves are stored in a deterministic archive.

use plugpack_core::archive::{ArchiveEntry, write_archive};
use plugpack_core::{Error, IoResultExt, Result};
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

/// File name of the bundle produced by translators.
pub const BUNDLE_FILE: &str = "classes.dex";

/// Inputs of a translation.
#[derive(Debug, Clone, Copy)]
pub struct TranslateRequest<'a> {
    /// Directory of compiled classes.
    pub classes_dir: &'a Path,
    /// Minimum platform version to target.
    pub min_platform_version: u32,
    /// Platform boot classpath.
    pub boot_classpath: &'a [PathBuf],
    /// Where the bundle is written.
    pub output: &'a Path,
}

/// Turns a module's class files into a bytecode bundle.
pub trait BundleTranslator: Debug + Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Full command line, for tools that run an external program.
    fn command_line(&self) -> &[String] {
        &[]
    }

    /// Writes the bundle to `request.output`.
    ///
    /// # Errors
    ///
    /// Returns an error if the class files cannot be read or the bundle
    /// cannot be produced.
    fn translate(&self, request: &TranslateRequest<'_>) -> Result<()>;
}

/// Class files under `dir`, sorted, with their `/`-separated relative paths.
fn class_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Err(Error::MissingFile {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "class") {
            continue;
        }
        let relative = path.strip_prefix(dir).map_err(|_| Error::Internal {
            message: format!("{} is outside {}", path.display(), dir.display()),
        })?;
        let name = relative.to_string_lossy().replace('\\', "/");
        files.push((name, path.to_path_buf()));
    }
    Ok(files)
}

/// Built-in translator: a deterministic zip of the class files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassArchiveTranslator;

impl BundleTranslator for ClassArchiveTranslator {
    fn name(&self) -> &str {
        "class-archive"
    }

    fn translate(&self, request: &TranslateRequest<'_>) -> Result<()> {
        let mut entries = Vec::new();
        for (name, path) in class_files(request.classes_dir)? {
            let data = fs::read(&path).with_path(&path)?;
            entries.push(ArchiveEntry::new(name, data));
        }

        write_archive(request.output, &entries)?;
        tracing::debug!(
            "Archived {} class files into {}",
            entries.len(),
            request.output.display()
        );
        Ok(())
    }
}

/// External platform translator (D8-style command line).
///
/// Invoked as
/// `<command…> --min-api <N> [--lib <boot>]… --output <dir> <class files…>`;
/// the translator must write `classes.dex` into `<dir>`.
#[derive(Debug, Clone)]
pub struct ExternalTranslator {
    command: Vec<String>,
}

impl ExternalTranslator {
    /// Creates a translator from a command line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if `command` is empty.
    pub fn new(command: Vec<String>) -> Result<Self> {
        if command.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(Error::ConfigError {
                message: "toolchain.translator must name a program".to_string(),
            });
        }
        Ok(Self { command })
    }

    fn program(&self) -> &str {
        self.command.first().map_or("", String::as_str)
    }
}

impl BundleTranslator for ExternalTranslator {
    fn name(&self) -> &str {
        self.program()
    }

    fn command_line(&self) -> &[String] {
        &self.command
    }

    fn translate(&self, request: &TranslateRequest<'_>) -> Result<()> {
        let files = class_files(request.classes_dir)?;
        let parent = request
            .output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).with_path(parent)?;
        let staging = tempfile::tempdir_in(parent).with_path(parent)?;

        let mut command = Command::new(self.program());
        command
            .args(&self.command[1..])
            .arg("--min-api")
            .arg(request.min_platform_version.to_string());
        for lib in request.boot_classpath {
            command.arg("--lib").arg(lib);
        }
        command.arg("--output").arg(staging.path());
        command.args(files.iter().map(|(_, path)| path));

        tracing::debug!("Running translator: {:?}", command);
        let output = command.output().map_err(|e| Error::ToolFailed {
            tool: self.program().to_string(),
            message: format!("failed to launch: {e}"),
        })?;

        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool: self.program().to_string(),
                message: format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let produced = staging.path().join(BUNDLE_FILE);
        if !produced.is_file() {
            return Err(Error::ToolFailed {
                tool: self.program().to_string(),
                message: format!("produced no {BUNDLE_FILE}"),
            });
        }
        fs::copy(&produced, request.output).with_path(request.output)?;
        Ok(())
    }
}
