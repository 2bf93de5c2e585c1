//! Write-once cells for values discovered during a build.
//!
//! The stage graph is wired before any stage runs, but some values (the
//! plugin entry point, the packaged jar size) only exist once a particular
//! stage has completed. A [`DeferredCell`] is created at wiring time, handed
//! to both the writer and the readers, and filled exactly once by the writer.
//!
//! Ordering is enforced by graph edges, not by the cell: a reader stage must
//! declare a dependency on the writer stage. Reading an empty cell is a
//! programming error and is reported as [`Error::UnresolvedCell`] rather than
//! falling back to a default.
//!
//! # Examples
//!
//! ```
//! use plugpack_core::DeferredCell;
//!
//! let entry_point: DeferredCell<String> = DeferredCell::new("entryPoint");
//! assert!(entry_point.get().unwrap_err().is_unresolved_cell());
//!
//! entry_point.set("com.example.ExamplePlugin".to_string()).unwrap();
//! assert_eq!(entry_point.get().unwrap(), "com.example.ExamplePlugin");
//! assert!(entry_point.set("other".to_string()).is_err());
//! ```

use crate::{Error, Result};
use std::sync::OnceLock;

/// Single-assignment cell populated by one stage and read by later stages.
#[derive(Debug)]
pub struct DeferredCell<T> {
    name: &'static str,
    value: OnceLock<T>,
}

impl<T> DeferredCell<T> {
    /// Creates an empty cell.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            value: OnceLock::new(),
        }
    }

    /// Name used in error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Resolves the cell.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CellAlreadySet`] if the cell already holds a value.
    pub fn set(&self, value: T) -> Result<()> {
        self.value
            .set(value)
            .map_err(|_| Error::CellAlreadySet { cell: self.name })
    }

    /// Reads the resolved value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedCell`] if the writer has not run yet.
    pub fn get(&self) -> Result<&T> {
        self.value
            .get()
            .ok_or(Error::UnresolvedCell { cell: self.name })
    }

    /// Reads the value if it has been resolved.
    ///
    /// Only for consumers that legitimately tolerate an absent value, such as
    /// the registry skipping modules that never reached the packaged state.
    #[must_use]
    pub fn try_get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Returns `true` once the writer has run.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T: Clone> DeferredCell<T> {
    /// Reads and clones the resolved value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedCell`] if the writer has not run yet.
    pub fn cloned(&self) -> Result<T> {
        self.get().cloned()
    }
}
