//! Chunked streaming copy for cross-volume moves.
//!
//! - Writes to a newly created destination file (O_EXCL semantics; never clobbers).
//! - Fixed-size chunks (64 KiB by default) keep memory flat on small boards.
//! - Cancellation is checked before every chunk.
//! - The destination is flushed and fsynced before returning.
//!
//! Snapshot semantics: the source is read once from start to EOF; callers
//! compare `bytes` with the length they validated.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use super::helpers::move_failed;
use crate::cancel::CancelToken;
use crate::errors::OrganizeError;

pub const COPY_CHUNK_DEFAULT: usize = 64 * 1024;

/// Result of a streaming copy operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyResult {
    /// Total bytes written to the destination.
    pub bytes: u64,
    /// Number of chunks written.
    pub chunks: u64,
}

/// Copy `src` -> `dst` chunk by chunk, then fsync `dst`.
/// `dst` must not exist. On error the partially written `dst` is left for the
/// caller to remove.
pub(crate) fn copy_chunked(
    src: &Path,
    dst: &Path,
    chunk_size: usize,
    cancel: &CancelToken,
) -> Result<CopyResult, OrganizeError> {
    let mut reader = File::open(src).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            OrganizeError::SourceMissing(src.to_path_buf())
        } else {
            move_failed("open source", src, dst)(e)
        }
    })?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .map_err(move_failed("create destination", src, dst))?;

    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut result = CopyResult { bytes: 0, chunks: 0 };
    loop {
        cancel.check()?;
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(move_failed("read source", src, dst)(e)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(move_failed("write destination", src, dst))?;
        result.bytes += n as u64;
        result.chunks += 1;
    }

    writer.flush().map_err(move_failed("flush destination", src, dst))?;
    writer.sync_all().map_err(move_failed("fsync destination", src, dst))?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn copy_small_file_ok() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        fs::write(&src, b"hello world").unwrap();

        let res = copy_chunked(&src, &dst, COPY_CHUNK_DEFAULT, &CancelToken::new()).unwrap();
        assert_eq!(res.bytes, 11);
        assert_eq!(res.chunks, 1);
        assert_eq!(fs::read(&dst).unwrap(), b"hello world");
    }

    #[test]
    fn copy_zero_length_ok() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("empty");
        let dst = dir.path().join("out");
        File::create(&src).unwrap();
        let res = copy_chunked(&src, &dst, COPY_CHUNK_DEFAULT, &CancelToken::new()).unwrap();
        assert_eq!(res.bytes, 0);
        assert_eq!(fs::metadata(&dst).unwrap().len(), 0);
    }

    #[test]
    fn fails_if_dest_exists() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::write(&src, b"data").unwrap();
        fs::write(&dst, b"x").unwrap();
        let err = copy_chunked(&src, &dst, COPY_CHUNK_DEFAULT, &CancelToken::new()).unwrap_err();
        match err {
            OrganizeError::MoveFailed { error, .. } => assert_eq!(error.kind(), io::ErrorKind::AlreadyExists),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fs::read(&dst).unwrap(), b"x");
    }

    #[test]
    fn chunk_boundaries() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("big.bin");
        let dst = dir.path().join("big.out");
        let chunk = 4096;
        let size = 3 * chunk + 123;
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        fs::write(&src, &data).unwrap();

        let res = copy_chunked(&src, &dst, chunk, &CancelToken::new()).unwrap();
        assert_eq!(res.bytes as usize, size);
        assert_eq!(res.chunks, 4);
        assert_eq!(fs::read(&dst).unwrap(), data);
    }

    #[test]
    fn cancelled_before_first_chunk() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("b");
        fs::write(&src, b"abc").unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = copy_chunked(&src, &dst, 1, &cancel).unwrap_err();
        assert!(matches!(err, OrganizeError::Cancelled));
        assert!(src.exists());
    }

    #[test]
    fn missing_source_maps_to_source_missing() {
        let dir = tempdir().unwrap();
        let err = copy_chunked(&dir.path().join("gone"), &dir.path().join("out"), 16, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, OrganizeError::SourceMissing(_)));
        assert!(!dir.path().join("out").exists());
    }
}
