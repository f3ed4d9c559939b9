//! Metadata preservation for copied files.
//! - Copies timestamps (atime, mtime) and, on Unix, permission bits.
//! - On Windows mirrors the readonly attribute.
//! - Best-effort: failures are logged and never fail the move.

use filetime::{FileTime, set_file_times};
use std::fs;
use std::path::Path;
use tracing::{trace, warn};

/// Apply `src_meta` (captured before the copy) to `dest`.
pub(crate) fn preserve_metadata(dest: &Path, src_meta: &fs::Metadata) {
    let (at, mt) = {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            (
                Some(FileTime::from_unix_time(src_meta.atime(), src_meta.atime_nsec() as u32)),
                Some(FileTime::from_unix_time(src_meta.mtime(), src_meta.mtime_nsec() as u32)),
            )
        }
        #[cfg(not(unix))]
        {
            (
                src_meta.accessed().ok().map(FileTime::from_system_time),
                src_meta.modified().ok().map(FileTime::from_system_time),
            )
        }
    };
    if let (Some(at), Some(mt)) = (at, mt) {
        match set_file_times(dest, at, mt) {
            Ok(()) => trace!(path = %dest.display(), "set atime/mtime on destination"),
            Err(e) => warn!(path = %dest.display(), error = %e, "failed to set atime/mtime on destination"),
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = src_meta.permissions().mode() & 0o7777;
        if let Err(e) = fs::set_permissions(dest, fs::Permissions::from_mode(mode)) {
            warn!(path = %dest.display(), mode = format!("{:o}", mode), error = %e, "failed to set permissions on destination");
        }
    }

    #[cfg(windows)]
    {
        let ro = src_meta.permissions().readonly();
        if let Ok(meta) = fs::metadata(dest) {
            let mut perms = meta.permissions();
            perms.set_readonly(ro);
            if let Err(e) = fs::set_permissions(dest, perms) {
                warn!(path = %dest.display(), readonly = ro, error = %e, "failed to set readonly attribute on destination");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn copies_mtime() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::write(&src, b"a").unwrap();
        fs::write(&dst, b"a").unwrap();
        let ts = FileTime::from_unix_time(1_700_000_000, 0);
        filetime::set_file_mtime(&src, ts).unwrap();

        preserve_metadata(&dst, &fs::metadata(&src).unwrap());
        let got = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
        assert_eq!(got.unix_seconds(), ts.unix_seconds());
    }

    #[cfg(unix)]
    #[test]
    fn copies_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::write(&src, b"a").unwrap();
        fs::write(&dst, b"a").unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o640)).unwrap();
        preserve_metadata(&dst, &fs::metadata(&src).unwrap());
        assert_eq!(fs::metadata(&dst).unwrap().permissions().mode() & 0o777, 0o640);
    }
}
