//! Strong domain types for plugin packaging.
//!
//! Module names become directory and file names (`<name>.cs3`), so they are
//! validated at construction. Class names are kept in dotted binary form
//! (`com.example.MyPlugin`) everywhere outside the class-file reader.
//!
//! # Examples
//!
//! ```
//! use plugpack_core::{ClassName, ModuleName};
//!
//! let module = ModuleName::new("ExampleProvider").unwrap();
//! assert_eq!(module.as_str(), "ExampleProvider");
//!
//! let class = ClassName::from_internal("com/example/ExamplePlugin");
//! assert_eq!(class.as_str(), "com.example.ExamplePlugin");
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a module name.
const MAX_MODULE_NAME_LEN: usize = 128;

/// Validated module name.
///
/// # Security
///
/// Rejects names that could escape the build directory:
/// - empty names
/// - path separators (`/`, `\`)
/// - parent references (`..`) and leading dots
/// - control characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleName(String);

impl ModuleName {
    /// Creates a validated module name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the name is empty, too long, or
    /// contains path components.
    ///
    /// # Examples
    ///
    /// ```
    /// use plugpack_core::ModuleName;
    ///
    /// assert!(ModuleName::new("MyProvider").is_ok());
    /// assert!(ModuleName::new("../escape").is_err());
    /// assert!(ModuleName::new("sub/dir").is_err());
    /// assert!(ModuleName::new("").is_err());
    /// ```
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("name is empty")
        } else if name.len() > MAX_MODULE_NAME_LEN {
            Some("name is longer than 128 characters")
        } else if name.contains(['/', '\\']) {
            Some("name contains a path separator")
        } else if name.starts_with('.') {
            Some("name starts with '.'")
        } else if name.chars().any(char::is_control) {
            Some("name contains control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Error::ConfigError {
                message: format!("invalid module name '{name}': {reason}"),
            }),
            None => Ok(Self(name)),
        }
    }

    /// Returns the module name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModuleName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ModuleName> for String {
    fn from(name: ModuleName) -> Self {
        name.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fully-qualified class name in dotted binary form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassName(String);

impl ClassName {
    /// Creates a class name from dotted form (`com.example.Plugin`).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a class name from the class-file internal form
    /// (`com/example/Plugin`).
    #[must_use]
    pub fn from_internal(internal: &str) -> Self {
        Self(internal.replace('/', "."))
    }

    /// Returns the dotted class name.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the name and returns the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
