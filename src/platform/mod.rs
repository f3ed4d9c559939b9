//! Platform-specific helpers.
//! This module hides OS differences (Unix/Windows) behind a uniform API so
//! the engine can stay platform-agnostic: free space, volume identity,
//! directory fsync, no-clobber rename, cross-device error detection and secure
//! file creation.

pub mod temp;

#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{
    free_space_bytes, fsync_dir, is_cross_device, open_log_file_secure_append, rename_no_replace, volume_id,
    write_config_secure_new_0600,
};

#[cfg(not(unix))]
pub use windows::{
    free_space_bytes, fsync_dir, is_cross_device, open_log_file_secure_append, rename_no_replace, volume_id,
    write_config_secure_new_0600,
};

/// Identity of the filesystem a path lives on.
/// Two paths with equal ids can be moved between with a single rename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VolumeId {
    /// Unix `st_dev`.
    Device(u64),
    /// Normalized volume root (drive letter or UNC share).
    Root(String),
}
