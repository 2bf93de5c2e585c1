//! Core types, configuration, and errors for plugin packaging.
//!
//! This crate provides the foundational types shared by every other crate in
//! the plugpack workspace.
//!
//! # Architecture
//!
//! The core consists of:
//! - Strong domain types (`ModuleName`, `ClassName`)
//! - The error taxonomy with remediation hints
//! - Module configuration and the workspace config file (`plugpack.toml`)
//! - The serialized package manifest (`manifest.json`)
//! - Write-once deferred cells used to pass values between stages
//! - Deterministic zip writing shared by every archive-producing stage

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod config;
mod deferred;
mod error;
mod manifest;
mod module;
mod types;

pub mod archive;
pub mod cli;

pub use config::{
    CONFIG_FILE, DeployConfig, ModuleLayout, ToolchainConfig, WorkspaceConfig, WorkspaceSettings,
};
pub use deferred::DeferredCell;
pub use error::{Error, IoResultExt, Result};
pub use manifest::PackageManifest;
pub use module::{CatalogMetadata, DEFAULT_MIN_PLATFORM_VERSION, Module};
pub use types::{ClassName, ModuleName};
