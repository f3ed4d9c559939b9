//! Volume queries used by validation: free space and filesystem identity.
//! Behind a trait so callers can simulate distinct volumes or a full disk.

use std::io;
use std::path::{Path, PathBuf};

use crate::platform::{self, VolumeId};

pub trait VolumeProbe: Send + Sync {
    /// Identity of the filesystem holding `path` (which must exist).
    fn volume_id(&self, path: &Path) -> io::Result<VolumeId>;

    /// Bytes available for writing on the filesystem holding `path` (which must exist).
    fn available_space(&self, path: &Path) -> io::Result<u64>;
}

/// The real filesystem, via statvfs / GetDiskFreeSpaceExW.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemVolumes;

impl VolumeProbe for SystemVolumes {
    fn volume_id(&self, path: &Path) -> io::Result<VolumeId> {
        platform::volume_id(path)
    }

    fn available_space(&self, path: &Path) -> io::Result<u64> {
        platform::free_space_bytes(path)
    }
}

/// Closest ancestor of `path` (or `path` itself) that exists on disk.
/// Relative paths fall back to the current directory.
pub fn existing_ancestor(path: &Path) -> Option<PathBuf> {
    let mut cur = Some(path);
    while let Some(p) = cur {
        if p.as_os_str().is_empty() {
            return Some(PathBuf::from("."));
        }
        if p.exists() {
            return Some(p.to_path_buf());
        }
        cur = p.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_ancestor_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("a").join("b").join("c.mkv");
        assert_eq!(existing_ancestor(&deep).unwrap(), dir.path());
        assert_eq!(existing_ancestor(dir.path()).unwrap(), dir.path());
    }

    #[test]
    fn relative_paths_resolve_to_cwd() {
        assert_eq!(
            existing_ancestor(Path::new("no_such_dir_xyz/file.mp3")).unwrap(),
            PathBuf::from(".")
        );
    }
}
