//! Packaging stages.
//!
//! Per module, in dependency order:
//!
//! | stage                    | writes                         |
//! |--------------------------|--------------------------------|
//! | `compileDex`             | `classes.dex`, `pluginClass`   |
//! | `compilePluginJar`       | `<module>.jar`                 |
//! | `ensureJarCompatibility` | nothing                        |
//! | `compileResources`       | `res.apk`                      |
//! | `writeManifest`          | `manifest.json`                |
//! | `make`                   | `<module>.cs3`                 |
//!
//! and once per workspace `makePluginsJson`, which writes `plugins.json`.

mod compat;
mod compile;
mod jar;
mod manifest;
mod package;
mod registry;
mod resources;

pub use compat::{CompatStage, CompatibilityVerdict, check_archive};
pub use compile::CompileStage;
pub use jar::JarStage;
pub use manifest::ManifestStage;
pub use package::{MANIFEST_ENTRY, PackageStage, RESOURCE_MANIFEST_ENTRY};
pub use registry::RegistryStage;
pub use resources::ResourceStage;
