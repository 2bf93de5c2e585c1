//! Plugin registry aggregation.
//!
//! The registry (`plugins.json`) lists every plugin package of a workspace
//! so a distribution index can show them without opening each package. It
//! is regenerated wholesale on every build from whatever modules reached the
//! packaged state.
//!
//! # Examples
//!
//! ```
//! use plugpack_core::{Module, ModuleName, PackageManifest};
//! use plugpack_registry::{PackageRecord, Registry};
//!
//! let module = Module::new(ModuleName::new("Example").unwrap(), "classes");
//! let record = PackageRecord {
//!     manifest: PackageManifest::from_module(&module).finalize("com.example.Plugin", None),
//!     archive_path: "build/Example/Example.cs3".into(),
//!     file_size: 2048,
//! };
//!
//! let registry = Registry::aggregate([Some(record)], Some("https://example.org/builds"));
//! assert_eq!(registry.len(), 1);
//! assert_eq!(registry.entries()[0].url, "https://example.org/builds/Example.cs3");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod registry;

pub use registry::{PackageRecord, REGISTRY_FILE, Registry, RegistryEntry};
