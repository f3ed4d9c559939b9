//! Move execution.
//! Same volume: one rename(2), which either fully happens or not at all.
//! Cross volume: chunked copy into a hidden `.partial` sibling, fsync, verify
//! length, rename into place, and only then delete the source.
//! Either way the source is still on disk if this returns an error.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::atomic::try_atomic_move;
use super::helpers::move_failed;
use super::io_copy::copy_chunked;
use super::metadata::preserve_metadata;
use crate::cancel::CancelToken;
use crate::errors::OrganizeError;
use crate::platform::{fsync_dir, is_cross_device, rename_no_replace, temp::partial_copy_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStrategy {
    Rename,
    CopyDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub bytes_moved: u64,
    pub duration: Duration,
    pub strategy: MoveStrategy,
}

#[derive(Debug, Clone)]
pub struct MoveExecutor {
    chunk_size: usize,
    preserve_metadata: bool,
}

impl MoveExecutor {
    pub fn new(chunk_size: usize, preserve_metadata: bool) -> Self {
        Self {
            chunk_size,
            preserve_metadata,
        }
    }

    /// Move `source` to `target`. `expected_len` is the validated source size;
    /// `replace` allows an existing target to be overwritten.
    pub fn execute(
        &self,
        source: &Path,
        target: &Path,
        cross_volume: bool,
        expected_len: u64,
        replace: bool,
        cancel: &CancelToken,
    ) -> Result<MoveOutcome, OrganizeError> {
        let started = Instant::now();
        cancel.check()?;
        let src_meta = stat_source(source, target, expected_len)?;

        let strategy = if cross_volume {
            self.copy_then_delete(source, target, &src_meta, expected_len, replace, cancel)?;
            MoveStrategy::CopyDelete
        } else if self.rename_in_place(source, target, expected_len, replace)? {
            MoveStrategy::Rename
        } else {
            warn!(src = %source.display(), dest = %target.display(), "rename crossed filesystems; falling back to copy");
            self.copy_then_delete(source, target, &src_meta, expected_len, replace, cancel)?;
            MoveStrategy::CopyDelete
        };

        let duration = started.elapsed();
        info!(
            src = %source.display(),
            dest = %target.display(),
            bytes = expected_len,
            strategy = ?strategy,
            elapsed_ms = duration.as_millis() as u64,
            "moved file"
        );
        Ok(MoveOutcome {
            bytes_moved: expected_len,
            duration,
            strategy,
        })
    }

    /// Ok(false) when the filesystems differ after all and a copy is needed.
    fn rename_in_place(
        &self,
        source: &Path,
        target: &Path,
        expected_len: u64,
        replace: bool,
    ) -> Result<bool, OrganizeError> {
        match try_atomic_move(source, target, replace) {
            Ok(()) => {}
            Err(e) if is_cross_device(&e) => return Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotFound && !source.exists() => {
                return Err(OrganizeError::SourceMissing(source.to_path_buf()));
            }
            Err(e) => return Err(placement_error("rename", source, target, replace)(e)),
        }
        verify_renamed(source, target, expected_len)?;
        Ok(true)
    }

    fn copy_then_delete(
        &self,
        source: &Path,
        target: &Path,
        src_meta: &fs::Metadata,
        expected_len: u64,
        replace: bool,
        cancel: &CancelToken,
    ) -> Result<(), OrganizeError> {
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let partial = partial_copy_path(dir);
        debug!(src = %source.display(), partial = %partial.display(), chunk = self.chunk_size, "streaming copy");

        let placed = self
            .copy_and_verify(source, &partial, target, src_meta, expected_len, cancel)
            .and_then(|()| {
                try_atomic_move(&partial, target, replace).map_err(placement_error(
                    "rename into place",
                    &partial,
                    target,
                    replace,
                ))
            });
        if let Err(e) = placed {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        // The copy is complete and durable; only now may the original go.
        if let Err(e) = fs::remove_file(source) {
            if replace {
                // The old target is already gone; the verified copy is the only one left there.
                error!(src = %source.display(), dest = %target.display(), "source could not be removed; the file now exists at both paths");
                return Err(move_failed("remove source after copy (copy kept at target)", source, target)(e));
            }
            let _ = fs::remove_file(target);
            return Err(move_failed("remove source after copy", source, target)(e));
        }
        if let Some(parent) = source.parent() {
            let _ = fsync_dir(parent);
        }
        Ok(())
    }

    fn copy_and_verify(
        &self,
        source: &Path,
        partial: &Path,
        target: &Path,
        src_meta: &fs::Metadata,
        expected_len: u64,
        cancel: &CancelToken,
    ) -> Result<(), OrganizeError> {
        let copied = copy_chunked(source, partial, self.chunk_size, cancel)?;
        if copied.bytes != expected_len {
            return Err(OrganizeError::SourceChanged {
                path: source.to_path_buf(),
                expected: expected_len,
                actual: copied.bytes,
            });
        }
        let on_disk = fs::metadata(partial)
            .map(|m| m.len())
            .map_err(move_failed("stat copied file", source, partial))?;
        if on_disk != expected_len {
            return Err(OrganizeError::VerificationFailed {
                path: target.to_path_buf(),
                expected: expected_len,
                actual: on_disk,
            });
        }
        if self.preserve_metadata {
            preserve_metadata(partial, src_meta);
        }
        cancel.check()
    }
}

/// `AlreadyExists` from a no-clobber placement means someone else took the name.
fn placement_error<'a>(
    op: &'a str,
    from: &'a Path,
    target: &'a Path,
    replace: bool,
) -> impl FnOnce(io::Error) -> OrganizeError + 'a {
    move |e: io::Error| {
        if !replace && e.kind() == io::ErrorKind::AlreadyExists {
            OrganizeError::TargetExists(target.to_path_buf())
        } else {
            move_failed(op, from, target)(e)
        }
    }
}

/// Length check after a same-volume rename. On mismatch the file is moved back
/// to `source`; if that fails too the error says where the file now is.
fn verify_renamed(source: &Path, target: &Path, expected_len: u64) -> Result<(), OrganizeError> {
    let actual = fs::metadata(target)
        .map(|m| m.len())
        .map_err(move_failed("stat renamed file (file is at the target)", source, target))?;
    if actual == expected_len {
        return Ok(());
    }
    if let Err(e) = rename_no_replace(target, source) {
        error!(
            src = %source.display(),
            dest = %target.display(),
            expected = expected_len,
            actual,
            "length mismatch after rename and the file could not be moved back; it remains at the target"
        );
        return Err(move_failed("move back after length mismatch", target, source)(e));
    }
    Err(OrganizeError::VerificationFailed {
        path: target.to_path_buf(),
        expected: expected_len,
        actual,
    })
}

fn stat_source(source: &Path, target: &Path, expected_len: u64) -> Result<fs::Metadata, OrganizeError> {
    let meta = match fs::metadata(source) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(OrganizeError::SourceMissing(source.to_path_buf()));
        }
        Err(e) => return Err(move_failed("stat source", source, target)(e)),
    };
    if meta.len() != expected_len {
        return Err(OrganizeError::SourceChanged {
            path: source.to_path_buf(),
            expected: expected_len,
            actual: meta.len(),
        });
    }
    Ok(meta)
}
