//! Idempotent directory materialization.
//! Creates the missing part of a directory chain root-to-leaf and reports what
//! it created. Leftover empty directories after a later failure are harmless
//! and are never removed here.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::OrganizeError;

/// What `ensure_directory` found and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeOutcome {
    pub already_existed: bool,
    /// Directories created by this call, root-to-leaf.
    pub created: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryMaterializer;

impl DirectoryMaterializer {
    pub fn new() -> Self {
        Self
    }

    pub fn ensure_directory(&self, path: &Path) -> Result<MaterializeOutcome, OrganizeError> {
        if path.is_dir() {
            return Ok(MaterializeOutcome {
                already_existed: true,
                created: Vec::new(),
            });
        }

        // Collect missing ancestors leaf-first, then create root-to-leaf.
        let mut missing = Vec::new();
        let mut cur = Some(path);
        while let Some(p) = cur {
            if p.as_os_str().is_empty() || p.exists() {
                break;
            }
            missing.push(p.to_path_buf());
            cur = p.parent();
        }
        missing.reverse();

        let mut created = Vec::with_capacity(missing.len());
        for dir in missing {
            match fs::create_dir(&dir) {
                Ok(()) => {
                    debug!(path = %dir.display(), "created directory");
                    created.push(dir);
                }
                // Another caller created it between our check and create_dir.
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
                Err(source) => {
                    return Err(OrganizeError::DirectoryCreation { path: dir, source });
                }
            }
        }

        Ok(MaterializeOutcome {
            already_existed: created.is_empty(),
            created,
        })
    }
}
