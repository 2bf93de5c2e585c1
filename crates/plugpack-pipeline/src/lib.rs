//! Build pipeline for plugin packages.
//!
//! Every module of a workspace is turned into a `.cs3` package by a chain of
//! stages. The stages of all modules form one graph that runs with bounded
//! parallelism; a final barrier stage writes the workspace registry.
//!
//! # Architecture
//!
//! - [`TaskGraph`]: dependency graph executor with hard and ordering edges
//! - [`FingerprintCache`]: persisted input fingerprints for up-to-date checks
//! - [`ModuleState`]: deferred values a module's stages hand to each other
//! - [`stages`]: the packaging stages
//! - [`tools`]: external tools behind traits
//! - [`Orchestrator`]: wires a workspace configuration into a graph
//! - [`deploy_package`]: pushes a built package to a device
//!
//! # Examples
//!
//! ```no_run
//! use plugpack_core::WorkspaceConfig;
//! use plugpack_pipeline::{BuildOptions, Orchestrator};
//!
//! # #[tokio::main]
//! # async fn main() -> plugpack_core::Result<()> {
//! let config = WorkspaceConfig::load("plugpack.toml")?;
//! let outcome = Orchestrator::from_config(config)?
//!     .build(&BuildOptions::default())
//!     .await?;
//!
//! for failure in outcome.report.failures() {
//!     eprintln!("{} failed", failure.label);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod cache;
mod deploy;
mod graph;
mod orchestrator;
mod state;

pub mod stages;
pub mod tools;

pub use cache::{FingerprintCache, Fingerprinter};
pub use deploy::{CommandTransport, DeployTransport, deploy_package};
pub use graph::{
    BuildReport, DependencyKind, Freshness, Stage, TaskGraph, TaskId, TaskOutcome, TaskReport,
};
pub use orchestrator::{BuildOptions, BuildOutcome, BuildPlan, Orchestrator};
pub use state::{ModuleState, PackagedArtifact};
pub use tools::Toolset;
