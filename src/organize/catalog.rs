//! Lookup of a file's current location by identifier.
//! The host's persistence layer implements `FileCatalog`; `MemoryCatalog`
//! serves the CLI batch mode and tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

pub trait FileCatalog: Send + Sync {
    /// Current on-disk location of `file_id`, if known.
    fn locate(&self, file_id: &str) -> Option<PathBuf>;
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: RwLock<HashMap<String, PathBuf>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, file_id: impl Into<String>, path: impl AsRef<Path>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file_id.into(), path.as_ref().to_path_buf());
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileCatalog for MemoryCatalog {
    fn locate(&self, file_id: &str) -> Option<PathBuf> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(file_id)
            .cloned()
    }
}
