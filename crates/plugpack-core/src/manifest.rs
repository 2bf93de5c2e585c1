//! The `manifest.json` document embedded in every plugin package.
//!
//! Fields without a value are omitted rather than serialized as `null`, so a
//! manifest written before the finalize step simply lacks `entryClassName`
//! and `byteSize`.

use crate::{Module, Result};
use serde::{Deserialize, Serialize};

/// Package metadata read by the host application when loading a plugin.
///
/// # Examples
///
/// ```
/// use plugpack_core::{Module, ModuleName, PackageManifest};
///
/// let module = Module::new(ModuleName::new("Example").unwrap(), "classes");
/// let manifest = PackageManifest::from_module(&module)
///     .finalize("com.example.ExamplePlugin", Some(1024));
///
/// let json = manifest.to_json().unwrap();
/// assert!(json.contains("\"entryClassName\":\"com.example.ExamplePlugin\""));
/// assert!(json.contains("\"byteSize\":1024"));
/// assert!(!json.contains("null"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Module name.
    pub name: String,

    /// Package version.
    pub version: String,

    /// Fully-qualified entry class instantiated by the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_class_name: Option<String>,

    /// Size of the packaged plugin jar in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_size: Option<u64>,

    /// Minimum supported platform version.
    pub min_platform_version: u32,

    /// Whether the package bundles compiled resources.
    pub requires_resources: bool,

    /// Whether the package is free of platform-only symbols.
    pub is_cross_platform: bool,

    /// Short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Plugin authors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,

    /// Content language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,

    /// Source repository URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,

    /// Availability status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,

    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl PackageManifest {
    /// Builds the configuration-time part of the manifest.
    ///
    /// `entry_class_name` and `byte_size` stay unset until [`finalize`]
    /// is called with values discovered during the build.
    ///
    /// [`finalize`]: Self::finalize
    #[must_use]
    pub fn from_module(module: &Module) -> Self {
        let catalog = module.catalog.clone();
        Self {
            name: module.name.to_string(),
            version: module.version.clone(),
            entry_class_name: None,
            byte_size: None,
            min_platform_version: module.min_platform_version,
            requires_resources: module.requires_resources,
            is_cross_platform: module.is_cross_platform,
            description: catalog.description,
            authors: catalog.authors,
            language: catalog.language,
            icon_url: catalog.icon_url,
            repository_url: catalog.repository_url,
            status: catalog.status,
            tags: catalog.tags,
        }
    }

    /// Fills in the values only known after the archive has been written.
    #[must_use]
    pub fn finalize(mut self, entry_class_name: impl Into<String>, byte_size: Option<u64>) -> Self {
        self.entry_class_name = Some(entry_class_name.into());
        self.byte_size = byte_size;
        self
    }

    /// Serializes the manifest compactly.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a manifest document.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid manifest.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModuleName;
    use serde_json::Value;

    fn module() -> Module {
        Module::new(ModuleName::new("Example").unwrap(), "classes")
    }

    #[test]
    fn test_unset_fields_are_omitted_not_null() {
        let manifest = PackageManifest::from_module(&module());
        let json = manifest.to_json().unwrap();

        let value: Value = serde_json::from_str(&json).unwrap();
        let map = value.as_object().unwrap();
        assert!(!map.contains_key("entryClassName"));
        assert!(!map.contains_key("byteSize"));
        assert!(!map.contains_key("description"));
        assert!(!map.contains_key("authors"));
        assert!(map.values().all(|v| !v.is_null()));
    }

    #[test]
    fn test_round_trip_keeps_absent_fields_absent() {
        let manifest = PackageManifest::from_module(&module()).finalize("a.B", None);
        let parsed = PackageManifest::from_json(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(parsed, manifest);
        assert_eq!(parsed.byte_size, None);

        let reserialized: Value = serde_json::to_value(&parsed).unwrap();
        assert!(reserialized.get("byteSize").is_none());
        assert_eq!(reserialized["entryClassName"], "a.B");
    }

    #[test]
    fn test_camel_case_schema() {
        let mut module = module();
        module.is_cross_platform = true;
        module.min_platform_version = 26;
        module.catalog.icon_url = Some("https://example.org/icon.png".to_string());

        let value = serde_json::to_value(PackageManifest::from_module(&module)).unwrap();
        assert_eq!(value["name"], "Example");
        assert_eq!(value["version"], "1");
        assert_eq!(value["minPlatformVersion"], 26);
        assert_eq!(value["requiresResources"], false);
        assert_eq!(value["isCrossPlatform"], true);
        assert_eq!(value["iconUrl"], "https://example.org/icon.png");
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let manifest = PackageManifest::from_module(&module()).finalize("a.B", Some(10));
        assert_eq!(manifest.to_json().unwrap(), manifest.to_json().unwrap());
    }
}
