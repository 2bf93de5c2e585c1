//! Library side of the `plugpack` command-line tool.
//!
//! Exposes the command implementations and output formatters so they can be
//! tested without spawning the binary.

#![allow(clippy::unused_async)]
#![allow(clippy::missing_errors_doc)]

pub mod commands;
pub mod formatters;
