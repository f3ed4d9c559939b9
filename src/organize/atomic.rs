//! Atomic rename helper.
//! - `replace = false` never clobbers: an existing destination, including one
//!   that appeared after validation, fails with `ErrorKind::AlreadyExists`.
//! - `replace = true` is a plain rename, which overwrites on every platform.
//! - Best-effort fsync of the destination directory after rename.

use std::fs;
use std::io;
use std::path::Path;

use crate::platform::{fsync_dir, rename_no_replace};

pub(crate) fn try_atomic_move(src: &Path, dst: &Path, replace: bool) -> io::Result<()> {
    if replace {
        fs::rename(src, dst)?;
    } else {
        rename_no_replace(src, dst)?;
    }

    if let Some(parent) = dst.parent() {
        // A failed fsync must not turn a completed rename into a failure.
        let _ = fsync_dir(parent);
    }
    Ok(())
}
