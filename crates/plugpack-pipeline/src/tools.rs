//! External tools invoked by stages.
//!
//! Each tool sits behind a trait so tests can substitute it and observe
//! whether it was called.

use plugpack_bytecode::{BundleTranslator, ClassArchiveTranslator, ExternalTranslator};
use plugpack_core::{Error, IoResultExt, Result, ToolchainConfig};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

/// Static dependency analyzer used by the compatibility check.
#[cfg_attr(test, mockall::automock)]
pub trait DependencyAnalyzer: Send + Sync {
    /// Runs the analyzer on `archive` and returns its standard output.
    ///
    /// The exit status is not inspected; only a failure to launch the
    /// analyzer is an error.
    ///
    /// # Errors
    ///
    /// Returns the launch error.
    fn print_module_deps(&self, archive: &Path) -> std::io::Result<String>;
}

/// Runs `<program> --print-module-deps <archive>` (jdeps-style).
#[derive(Debug, Clone)]
pub struct JdepsAnalyzer {
    program: String,
}

impl JdepsAnalyzer {
    /// Creates an analyzer invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl DependencyAnalyzer for JdepsAnalyzer {
    fn print_module_deps(&self, archive: &Path) -> std::io::Result<String> {
        tracing::debug!("Running {} --print-module-deps {}", self.program, archive.display());
        let output = Command::new(&self.program)
            .arg("--print-module-deps")
            .arg(archive)
            .output()?;
        if !output.status.success() {
            tracing::debug!("{} exited with {}", self.program, output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Inputs of a resource compilation.
#[derive(Debug, Clone, Copy)]
pub struct ResourceRequest<'a> {
    /// Resource source directory.
    pub resource_dir: &'a Path,
    /// Generated platform manifest fragment.
    pub manifest_fragment: &'a Path,
    /// Platform boot classpath.
    pub boot_classpath: &'a [PathBuf],
    /// Scratch directory for intermediate files.
    pub work_dir: &'a Path,
    /// Resource archive to write.
    pub output: &'a Path,
}

/// Compiles a resource tree into a resource archive.
pub trait ResourceCompiler: Send + Sync {
    /// Writes the resource archive to `request.output`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolFailed`] if the compiler fails.
    fn compile(&self, request: &ResourceRequest<'_>) -> Result<()>;
}

/// AAPT2-style resource compiler.
///
/// Runs `<program> compile --dir <res> -o <work>/res-compiled.zip`, then
/// `<program> link <work>/res-compiled.zip --manifest <fragment> [-I <boot>]…
/// -o <output>`.
#[derive(Debug, Clone)]
pub struct Aapt2Compiler {
    program: String,
}

impl Aapt2Compiler {
    /// Creates a compiler invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, command: &mut Command) -> Result<()> {
        tracing::debug!("Running resource compiler: {:?}", command);
        let output = command.output().map_err(|e| Error::ToolFailed {
            tool: self.program.clone(),
            message: format!("failed to launch: {e}"),
        })?;
        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool: self.program.clone(),
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

impl ResourceCompiler for Aapt2Compiler {
    fn compile(&self, request: &ResourceRequest<'_>) -> Result<()> {
        std::fs::create_dir_all(request.work_dir).with_path(request.work_dir)?;
        let compiled = request.work_dir.join("res-compiled.zip");

        self.run(
            Command::new(&self.program)
                .arg("compile")
                .arg("--dir")
                .arg(request.resource_dir)
                .arg("-o")
                .arg(&compiled),
        )?;

        let mut link = Command::new(&self.program);
        link.arg("link")
            .arg(&compiled)
            .arg("--manifest")
            .arg(request.manifest_fragment);
        for lib in request.boot_classpath {
            link.arg("-I").arg(lib);
        }
        link.arg("-o").arg(request.output);
        self.run(&mut link)
    }
}

/// The external tools of one build.
#[derive(Clone)]
pub struct Toolset {
    /// Bytecode bundle translator.
    pub translator: Arc<dyn BundleTranslator>,
    /// Compatibility analyzer.
    pub analyzer: Arc<dyn DependencyAnalyzer>,
    /// Resource compiler.
    pub resources: Arc<dyn ResourceCompiler>,
}

impl fmt::Debug for Toolset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toolset")
            .field("translator", &self.translator.name())
            .finish_non_exhaustive()
    }
}

impl Toolset {
    /// Tools described by the toolchain configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the translator command is empty.
    pub fn from_config(toolchain: &ToolchainConfig) -> Result<Self> {
        let translator: Arc<dyn BundleTranslator> = match &toolchain.translator {
            Some(command) => Arc::new(ExternalTranslator::new(command.clone())?),
            None => Arc::new(ClassArchiveTranslator),
        };
        Ok(Self {
            translator,
            analyzer: Arc::new(JdepsAnalyzer::new(toolchain.analyzer.clone())),
            resources: Arc::new(Aapt2Compiler::new(toolchain.resource_compiler.clone())),
        })
    }

    /// Replaces the analyzer.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Arc<dyn DependencyAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Replaces the resource compiler.
    #[must_use]
    pub fn with_resource_compiler(mut self, resources: Arc<dyn ResourceCompiler>) -> Self {
        self.resources = resources;
        self
    }

    /// Replaces the translator.
    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn BundleTranslator>) -> Self {
        self.translator = translator;
        self
    }
}
