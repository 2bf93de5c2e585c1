//! Command implementations for the `plugpack` CLI.
//!
//! Each command loads what it needs, does its work, prints a result through
//! [`formatters`](crate::formatters) and returns an exit code.

pub mod build;
pub mod check;
pub mod clean;
pub mod common;
pub mod completions;
pub mod deploy;
pub mod registry;
pub mod setup;
