//! Static bytecode inspection for plugin packaging.
//!
//! This crate reads compiled class files without executing them. It is used
//! to find the plugin entry point of a module and to turn the module's
//! classes into the bytecode bundle stored in the package.
//!
//! # Architecture
//!
//! - [`ClassInfo`]: structural reader for a single class file
//! - [`ClassIndex`]: deterministic index over class directories and jars
//! - [`discover_entry_point`] / [`resolve_entry_point`]: entry-point search
//! - [`BundleTranslator`]: external translator command or the built-in
//!   class archive
//!
//! # Examples
//!
//! ```no_run
//! use plugpack_bytecode::discover_entry_point;
//! use std::path::Path;
//!
//! let entry = discover_entry_point(
//!     "Example",
//!     Path::new("build/classes"),
//!     &[],
//!     &["com.lagradost.cloudstream3.plugins.Plugin".to_string()],
//! )?;
//! println!("entry point: {entry}");
//! # Ok::<(), plugpack_core::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod classfile;
mod discovery;
mod index;
mod translator;

pub use classfile::{ACC_ABSTRACT, ACC_INTERFACE, CLASS_MAGIC, ClassInfo};
pub use discovery::{discover_entry_point, resolve_entry_point};
pub use index::ClassIndex;
pub use translator::{
    BUNDLE_FILE, BundleTranslator, ClassArchiveTranslator, ExternalTranslator, TranslateRequest,
};
