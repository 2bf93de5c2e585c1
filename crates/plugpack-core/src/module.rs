//! Module configuration.
//!
//! A [`Module`] is one compilable unit of the workspace that produces one
//! plugin package. It is declared as a `[[module]]` table in `plugpack.toml`
//! and never changes once the pipeline starts.

use crate::ModuleName;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Minimum platform version used when a module does not declare one.
pub const DEFAULT_MIN_PLATFORM_VERSION: u32 = 21;

fn default_version() -> String {
    "1".to_string()
}

const fn default_min_platform_version() -> u32 {
    DEFAULT_MIN_PLATFORM_VERSION
}

/// A plugin module.
///
/// # Examples
///
/// ```
/// use plugpack_core::Module;
///
/// let module: Module = toml::from_str(r#"
///     name = "ExampleProvider"
///     classes_dir = "build/classes"
///     description = "Example streams"
/// "#).unwrap();
///
/// assert_eq!(module.name.as_str(), "ExampleProvider");
/// assert_eq!(module.version, "1");
/// assert_eq!(module.min_platform_version, 21);
/// assert!(!module.is_cross_platform);
/// assert_eq!(module.catalog.description.as_deref(), Some("Example streams"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Module name; also the package file stem.
    pub name: ModuleName,

    /// Package version string.
    #[serde(default = "default_version")]
    pub version: String,

    /// Directory of compiled `.class` files produced by the compiler toolchain.
    pub classes_dir: PathBuf,

    /// Extra directories or jars consulted when resolving class ancestry.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,

    /// Full compiled archive (all classes plus dependencies) to repackage as
    /// the plugin jar.
    #[serde(default)]
    pub full_archive: Option<PathBuf>,

    /// Entry class override; skips entry-point discovery when set.
    #[serde(default)]
    pub entry_class: Option<String>,

    /// Forbid platform-only symbols so the package loads on every host.
    #[serde(default)]
    pub is_cross_platform: bool,

    /// Compile and bundle platform resources.
    #[serde(default)]
    pub requires_resources: bool,

    /// Resource source directory (required with `requires_resources`).
    #[serde(default)]
    pub resource_dir: Option<PathBuf>,

    /// Generated platform manifest fragment (required with
    /// `requires_resources`).
    #[serde(default)]
    pub manifest_fragment: Option<PathBuf>,

    /// Minimum supported platform version.
    #[serde(default = "default_min_platform_version")]
    pub min_platform_version: u32,

    /// Descriptive metadata published in the manifest and registry.
    #[serde(flatten)]
    pub catalog: CatalogMetadata,
}

/// Descriptive package metadata shown by the distribution index.
///
/// Every field is optional; unset fields are omitted from `manifest.json`
/// and `plugins.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    /// Short description of the plugin.
    #[serde(default)]
    pub description: Option<String>,

    /// Plugin authors.
    #[serde(default)]
    pub authors: Vec<String>,

    /// Content language (ISO 639-1).
    #[serde(default)]
    pub language: Option<String>,

    /// Icon URL.
    #[serde(default)]
    pub icon_url: Option<String>,

    /// Source repository URL.
    #[serde(default)]
    pub repository_url: Option<String>,

    /// Availability status (0 = down, 1 = ok, 2 = slow, 3 = beta only).
    #[serde(default)]
    pub status: Option<i32>,

    /// Free-form tags (content types).
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Module {
    /// Creates a module with default settings.
    #[must_use]
    pub fn new(name: ModuleName, classes_dir: impl Into<PathBuf>) -> Self {
        Self {
            name,
            version: default_version(),
            classes_dir: classes_dir.into(),
            classpath: Vec::new(),
            full_archive: None,
            entry_class: None,
            is_cross_platform: false,
            requires_resources: false,
            resource_dir: None,
            manifest_fragment: None,
            min_platform_version: DEFAULT_MIN_PLATFORM_VERSION,
            catalog: CatalogMetadata::default(),
        }
    }

    /// Returns `true` if the jar packaging stage is wired for this module.
    #[must_use]
    pub const fn packages_jar(&self) -> bool {
        self.full_archive.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_module_defaults() {
        let module: Module = toml::from_str(
            r#"
            name = "Minimal"
            classes_dir = "classes"
            "#,
        )
        .unwrap();

        assert_eq!(module.version, "1");
        assert_eq!(module.min_platform_version, DEFAULT_MIN_PLATFORM_VERSION);
        assert!(module.full_archive.is_none());
        assert!(!module.packages_jar());
        assert_eq!(module.catalog, CatalogMetadata::default());
    }

    #[test]
    fn test_full_module() {
        let module: Module = toml::from_str(
            r#"
            name = "Full"
            version = "7"
            classes_dir = "classes"
            classpath = ["libs/api.jar"]
            full_archive = "full.jar"
            entry_class = "com.example.FullPlugin"
            is_cross_platform = true
            requires_resources = true
            resource_dir = "res"
            manifest_fragment = "AndroidManifest.xml"
            min_platform_version = 24
            authors = ["alice", "bob"]
            status = 3
            tags = ["Movie"]
            "#,
        )
        .unwrap();

        assert_eq!(module.version, "7");
        assert!(module.packages_jar());
        assert_eq!(module.entry_class.as_deref(), Some("com.example.FullPlugin"));
        assert_eq!(module.catalog.authors, vec!["alice", "bob"]);
        assert_eq!(module.catalog.status, Some(3));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let result: Result<Module, _> = toml::from_str(
            r#"
            name = "../evil"
            classes_dir = "classes"
            "#,
        );
        assert!(result.is_err());
    }
}
