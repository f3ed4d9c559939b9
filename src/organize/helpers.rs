//! I/O helper utilities.
//!
//! Small adapters that enrich io::Error with actionable hints while keeping the
//! original ErrorKind, plus a byte formatter for human-readable messages.
//!
//! Usage:
//!   File::open(p).map_err(io_error_with_help("open source", p))?;
//!   fs::rename(a, b).map_err(move_failed("rename", a, b))?;

use std::io;
use std::path::Path;

use crate::errors::OrganizeError;

pub(crate) fn format_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let f = n as f64;
    if f >= GB {
        format!("{:.1} GiB", f / GB)
    } else if f >= MB {
        format!("{:.1} MiB", f / MB)
    } else if f >= KB {
        format!("{:.1} KiB", f / KB)
    } else {
        format!("{} B", n)
    }
}

fn hint_for(e: &io::Error) -> Option<&'static str> {
    if let Some(code) = e.raw_os_error() {
        #[cfg(unix)]
        {
            let hint = match code {
                libc::EACCES | libc::EPERM => Some("permission denied; check ownership and write permissions"),
                libc::EXDEV => Some("cross-filesystem; atomic rename not possible"),
                libc::EBUSY => Some("resource busy; ensure no other process is writing"),
                libc::ENOENT => Some("path not found; verify it exists"),
                libc::EEXIST => Some("already exists; pick a unique name or remove the target"),
                libc::ENOSPC => Some("insufficient space on device"),
                libc::EROFS => Some("read-only filesystem; cannot write here"),
                libc::ENAMETOOLONG => Some("filename or path too long; shorten path segments"),
                libc::EMFILE | libc::ENFILE => Some("too many open files"),
                libc::EIO => Some("I/O error; the disk or network share may be failing"),
                _ => None,
            };
            if hint.is_some() {
                return hint;
            }
        }
        #[cfg(windows)]
        {
            let hint = match code {
                5 => Some("access denied; check permissions"),
                17 => Some("not same device; cross-filesystem move"),
                32 => Some("sharing violation; file is in use"),
                2 | 3 => Some("path not found; verify it exists"),
                80 | 183 => Some("already exists; pick a unique name"),
                112 => Some("insufficient disk space"),
                19 => Some("write protected / read-only media"),
                206 => Some("filename or path too long"),
                _ => None,
            };
            if hint.is_some() {
                return hint;
            }
        }
        let _ = code;
    }
    match e.kind() {
        io::ErrorKind::PermissionDenied => Some("permission denied; check ownership and write permissions"),
        io::ErrorKind::NotFound => Some("path not found; verify it exists"),
        io::ErrorKind::AlreadyExists => Some("already exists; remove or choose a unique name"),
        _ => None,
    }
}

fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    if let Some(hint) = hint_for(e) {
        msg.push_str(" (");
        msg.push_str(hint);
        msg.push(')');
    }
    msg
}

/// Returns a closure for `.map_err(...)` that converts io::Error -> io::Error
/// with op/path/hint in the message while preserving the original ErrorKind.
pub(crate) fn io_error_with_help<'a>(op: &'a str, path: &'a Path) -> impl FnOnce(io::Error) -> io::Error + 'a {
    move |e: io::Error| io::Error::new(e.kind(), build_message(op, path, &e))
}

/// Returns a closure for `.map_err(...)` producing `OrganizeError::MoveFailed`.
pub(crate) fn move_failed<'a>(
    op: &'a str,
    from: &'a Path,
    to: &'a Path,
) -> impl FnOnce(io::Error) -> OrganizeError + 'a {
    move |e: io::Error| OrganizeError::MoveFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error: io::Error::new(e.kind(), build_message(op, from, &e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(100 * 1024 * 1024), "100.0 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }

    #[test]
    fn help_preserves_kind_and_adds_hint() {
        let e = io::Error::new(io::ErrorKind::NotFound, "gone");
        let wrapped = io_error_with_help("open source", Path::new("/x/y"))(e);
        assert_eq!(wrapped.kind(), io::ErrorKind::NotFound);
        let msg = wrapped.to_string();
        assert!(msg.contains("open source '/x/y'"));
        assert!(msg.contains("verify it exists"));
    }

    #[cfg(unix)]
    #[test]
    fn os_code_hints() {
        let e = io::Error::from_raw_os_error(libc::ENOSPC);
        let msg = io_error_with_help("write", Path::new("/lib/a"))(e).to_string();
        assert!(msg.contains("insufficient space"));
    }

    #[test]
    fn move_failed_carries_paths() {
        let e = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = move_failed("rename", Path::new("/a"), Path::new("/b"))(e);
        match err {
            OrganizeError::MoveFailed { from, to, error } => {
                assert_eq!(from, Path::new("/a"));
                assert_eq!(to, Path::new("/b"));
                assert_eq!(error.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
