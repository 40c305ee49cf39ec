//! In-memory mock filesystem for testing counters without real `/proc`.
//!
//! Clones of a `MockFs` share their contents, so a test can keep one clone
//! and rewrite `/proc` files after the other was moved into a counter source.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct Entries {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    directories: HashSet<PathBuf>,
}

impl Entries {
    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

/// In-memory filesystem for testing.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    entries: Arc<RwLock<Entries>>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.add_parents(&path);
        entries.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.add_parents(&path);
        entries.directories.insert(path);
    }

    /// Removes a file; returns `true` if it existed.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .files
            .remove(path.as_ref())
            .is_some()
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.files.contains_key(path) || entries.directories.contains(path)
    }
}
