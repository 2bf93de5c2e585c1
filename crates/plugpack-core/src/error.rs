//! Error types for plugin packaging.
//!
//! Every stage of the packaging pipeline reports failures through [`Error`].
//! Variants carry enough context to tell the author which module failed and
//! what to do about it; see [`Error::remediation`].
//!
//! # Examples
//!
//! ```
//! use plugpack_core::{Error, Result};
//!
//! fn check_modules(count: usize) -> Result<()> {
//!     if count == 0 {
//!         return Err(Error::ConfigError {
//!             message: "no plugin modules declared".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! let err = check_modules(0).unwrap_err();
//! assert!(err.is_config_error());
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for plugin packaging.
#[derive(Error, Debug)]
pub enum Error {
    /// Workspace configuration is invalid.
    ///
    /// Raised before any stage runs, e.g. when the workspace declares no
    /// plugin modules or a module combines contradictory settings.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// No class implementing the plugin contract was found.
    #[error("Entry point not found for module '{module}': no compiled class extends {}", base_types.join(" or "))]
    EntryPointNotFound {
        /// Module whose classes were scanned
        module: String,
        /// Plugin base types that were searched for
        base_types: Vec<String>,
    },

    /// A cross-platform package references platform-only symbols.
    #[error(
        "The cross-platform archive of module '{module}' references the platform-only namespace '{prefix}'"
    )]
    CompatibilityViolation {
        /// Offending module
        module: String,
        /// Namespace prefix found in the analyzer output
        prefix: String,
    },

    /// A file that a stage needs does not exist.
    #[error("File does not exist: {}", path.display())]
    MissingFile {
        /// Absolute path of the missing file
        path: PathBuf,
    },

    /// A class file could not be parsed.
    #[error("Invalid class file {origin}: {reason}")]
    ClassFormat {
        /// Where the class file came from (path or `archive!entry`)
        origin: String,
        /// What was wrong with it
        reason: String,
    },

    /// An external tool (bytecode translator, resource compiler, deploy
    /// transport) could not be run or exited unsuccessfully.
    #[error("External tool '{tool}' failed: {message}")]
    ToolFailed {
        /// Program name
        tool: String,
        /// Captured diagnostics
        message: String,
    },

    /// A deferred value was read before the stage producing it completed.
    #[error("Deferred value '{cell}' was read before its producing stage completed")]
    UnresolvedCell {
        /// Name of the cell
        cell: &'static str,
    },

    /// A deferred value was written twice.
    #[error("Deferred value '{cell}' was already resolved")]
    CellAlreadySet {
        /// Name of the cell
        cell: &'static str,
    },

    /// The stage graph has a dependency cycle.
    #[error("Stage graph contains a dependency cycle through '{task}'")]
    GraphCycle {
        /// One task that is part of the cycle
        task: String,
    },

    /// Reading or writing a zip container failed.
    #[error("Archive error in {}: {message}", path.display())]
    ArchiveError {
        /// Archive path
        path: PathBuf,
        /// Description from the zip layer
        message: String,
    },

    /// I/O error with the path it happened on.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Description of the serialization failure
        message: String,
        /// Underlying serde error
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Internal failure of the executor itself (e.g. a stage panicked).
    #[error("Internal error: {message}")]
    Internal {
        /// Description
        message: String,
    },
}

impl Error {
    /// Wraps an I/O error together with the path it occurred on.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::MissingFile { path };
        }
        Self::Io { path, source }
    }

    /// Wraps a zip error for the given archive.
    #[must_use]
    pub fn archive(path: impl Into<PathBuf>, source: &zip::result::ZipError) -> Self {
        Self::ArchiveError {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError { .. })
    }

    /// Returns `true` if entry-point discovery failed.
    #[must_use]
    pub const fn is_discovery_error(&self) -> bool {
        matches!(self, Self::EntryPointNotFound { .. })
    }

    /// Returns `true` if this is a cross-platform compatibility violation.
    ///
    /// # Examples
    ///
    /// ```
    /// use plugpack_core::Error;
    ///
    /// let err = Error::CompatibilityViolation {
    ///     module: "Example".to_string(),
    ///     prefix: "android.".to_string(),
    /// };
    /// assert!(err.is_compatibility_violation());
    /// assert!(err.remediation().unwrap().contains("is_cross_platform"));
    /// ```
    #[must_use]
    pub const fn is_compatibility_violation(&self) -> bool {
        matches!(self, Self::CompatibilityViolation { .. })
    }

    /// Returns `true` if a required file is missing.
    #[must_use]
    pub const fn is_missing_file(&self) -> bool {
        matches!(self, Self::MissingFile { .. })
    }

    /// Returns `true` if a deferred cell was read too early.
    #[must_use]
    pub const fn is_unresolved_cell(&self) -> bool {
        matches!(self, Self::UnresolvedCell { .. })
    }

    /// Human-readable hint on how to fix the error, if there is one.
    #[must_use]
    pub fn remediation(&self) -> Option<String> {
        match self {
            Self::ConfigError { .. } => Some("Fix the workspace configuration in plugpack.toml".to_string()),
            Self::EntryPointNotFound { base_types, .. } => Some(format!(
                "Add a class extending {} or set `entry_class` for the module",
                base_types.join(" or ")
            )),
            Self::CompatibilityViolation { prefix, .. } => Some(format!(
                "Remove 'is_cross_platform = true' or remove the '{prefix}' imports"
            )),
            Self::MissingFile { .. } => {
                Some("Make sure the compiler toolchain produced this file before packaging".to_string())
            }
            Self::UnresolvedCell { .. } | Self::GraphCycle { .. } => {
                Some("Check the dependency edges of the stage graph".to_string())
            }
            _ => None,
        }
    }
}

/// Result type alias for packaging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Attaches a path to bare I/O results.
///
/// # Examples
///
/// ```
/// use plugpack_core::IoResultExt;
///
/// let err = std::fs::read("/definitely/not/here").with_path("/definitely/not/here").unwrap_err();
/// assert!(err.is_missing_file());
/// ```
pub trait IoResultExt<T> {
    /// Converts the I/O error into [`Error::Io`] (or [`Error::MissingFile`]).
    ///
    /// # Errors
    ///
    /// Returns the wrapped error if `self` is an error.
    fn with_path(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| Error::io(path.as_ref(), e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::SerializationError {
            message: source.to_string(),
            source: Some(source),
        }
    }
}
