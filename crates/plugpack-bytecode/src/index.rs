//! Deterministic index of compiled classes.

use crate::ClassInfo;
use plugpack_core::archive::read_entries;
use plugpack_core::{ClassName, Error, IoResultExt, Result};
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

/// Classes loaded from directories and jars.
///
/// Iteration follows load order: roots in the order they were added, files
/// within a directory sorted by name at every level, and jar entries sorted by
/// entry name. When two roots define the same class, the first one wins.
#[derive(Debug, Default)]
pub struct ClassIndex {
    classes: Vec<ClassInfo>,
    by_name: HashMap<ClassName, usize>,
}

impl ClassIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every root in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFile`] if a root does not exist, or
    /// [`Error::ClassFormat`] if a class file cannot be parsed.
    pub fn load(roots: &[impl AsRef<Path>]) -> Result<Self> {
        let mut index = Self::new();
        for root in roots {
            index.add_root(root.as_ref())?;
        }
        Ok(index)
    }

    /// Adds a class directory or a `.jar` archive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFile`] if `root` does not exist, or
    /// [`Error::ClassFormat`] if a class file cannot be parsed.
    pub fn add_root(&mut self, root: &Path) -> Result<()> {
        if root.is_dir() {
            self.add_directory(root)
        } else if root.is_file() {
            self.add_jar(root)
        } else {
            Err(Error::MissingFile {
                path: root.to_path_buf(),
            })
        }
    }

    fn add_directory(&mut self, dir: &Path) -> Result<()> {
        let before = self.classes.len();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                match e.into_io_error() {
                    Some(io) => Error::io(path, io),
                    None => Error::Internal {
                        message: format!("filesystem loop while walking {}", dir.display()),
                    },
                }
            })?;
            if !entry.file_type().is_file() || !is_class_file(&entry.file_name().to_string_lossy()) {
                continue;
            }

            let path = entry.path();
            let bytes = std::fs::read(path).with_path(path)?;
            self.insert(ClassInfo::parse(&bytes, &path.display().to_string())?);
        }
        tracing::debug!(
            "Indexed {} classes from {}",
            self.classes.len() - before,
            dir.display()
        );
        Ok(())
    }

    fn add_jar(&mut self, jar: &Path) -> Result<()> {
        let before = self.classes.len();
        let mut entries = read_entries(jar)?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        for entry in entries.iter().filter(|e| is_class_file(&e.name)) {
            let origin = format!("{}!{}", jar.display(), entry.name);
            self.insert(ClassInfo::parse(&entry.data, &origin)?);
        }
        tracing::debug!(
            "Indexed {} classes from {}",
            self.classes.len() - before,
            jar.display()
        );
        Ok(())
    }

    fn insert(&mut self, info: ClassInfo) {
        if self.by_name.contains_key(&info.name) {
            tracing::debug!("Ignoring duplicate definition of {}", info.name);
            return;
        }
        self.by_name.insert(info.name.clone(), self.classes.len());
        self.classes.push(info);
    }

    /// Looks up a class by dotted name.
    #[must_use]
    pub fn get(&self, name: &ClassName) -> Option<&ClassInfo> {
        self.by_name.get(name).map(|&i| &self.classes[i])
    }

    /// Iterates classes in load order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.iter()
    }

    /// Number of indexed classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no class was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

fn is_class_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("class"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_class_file() {
        assert!(is_class_file("a/B.class"));
        assert!(is_class_file("B.CLASS"));
        assert!(!is_class_file("META-INF/MANIFEST.MF"));
        assert!(!is_class_file("class"));
    }

    #[test]
    fn test_missing_root() {
        let err = ClassIndex::load(&["/no/such/classes"]).unwrap_err();
        assert!(err.is_missing_file());
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let index = ClassIndex::load(&[dir.path()]).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }
}
