//! Plugin entry-point discovery.
//!
//! The entry point is the first concrete class, in deterministic order, whose
//! ancestry reaches one of the configured plugin base types. Ancestry is
//! followed through superclasses and interfaces of every class available
//! locally: the module's own classes plus its classpath.

use crate::{ClassIndex, ClassInfo};
use plugpack_core::{ClassName, Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Finds the plugin entry class of a module.
///
/// Candidates are the classes under `classes_dir`, visited in sorted path
/// order. Interfaces and abstract classes are never candidates. Supertypes
/// that are not found locally end the walk along that branch.
///
/// # Errors
///
/// Returns [`Error::EntryPointNotFound`] if no candidate matches,
/// [`Error::MissingFile`] if `classes_dir` does not exist, or
/// [`Error::ClassFormat`] for an unreadable class file.
pub fn discover_entry_point(
    module: &str,
    classes_dir: &Path,
    classpath: &[PathBuf],
    base_types: &[String],
) -> Result<ClassName> {
    let candidates = ClassIndex::load(&[classes_dir])?;

    let mut library = ClassIndex::new();
    for root in classpath {
        match library.add_root(root) {
            Ok(()) => {}
            Err(e) if e.is_missing_file() => {
                tracing::warn!("Classpath entry {} does not exist, skipping", root.display());
            }
            Err(e) => return Err(e),
        }
    }

    let bases: HashSet<ClassName> = base_types.iter().map(|b| ClassName::new(b.as_str())).collect();
    let lookup = |name: &ClassName| candidates.get(name).or_else(|| library.get(name));

    let found = candidates
        .iter()
        .filter(|class| class.is_concrete())
        .find(|&class| reaches_base(class, &bases, &lookup));

    match found {
        Some(class) => {
            tracing::debug!("Discovered entry point {} for module {}", class.name, module);
            Ok(class.name.clone())
        }
        None => Err(Error::EntryPointNotFound {
            module: module.to_string(),
            base_types: base_types.to_vec(),
        }),
    }
}

/// Returns the configured entry class when there is one, otherwise discovers
/// it with [`discover_entry_point`].
///
/// # Errors
///
/// Propagates discovery errors; an override never fails.
pub fn resolve_entry_point(
    entry_override: Option<&str>,
    module: &str,
    classes_dir: &Path,
    classpath: &[PathBuf],
    base_types: &[String],
) -> Result<ClassName> {
    if let Some(entry) = entry_override {
        tracing::debug!("Using configured entry point {} for module {}", entry, module);
        return Ok(ClassName::new(entry));
    }
    discover_entry_point(module, classes_dir, classpath, base_types)
}

fn reaches_base<'a>(
    class: &'a ClassInfo,
    bases: &HashSet<ClassName>,
    lookup: &impl Fn(&ClassName) -> Option<&'a ClassInfo>,
) -> bool {
    let mut visited: HashSet<&ClassName> = HashSet::new();
    let mut stack: Vec<&ClassName> = class.supertypes().collect();

    while let Some(name) = stack.pop() {
        if bases.contains(name) {
            return true;
        }
        if !visited.insert(name) {
            continue;
        }
        if let Some(parent) = lookup(name) {
            stack.extend(parent.supertypes());
        }
    }
    false
}
