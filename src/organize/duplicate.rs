//! Unique target names for the `rename` conflict policy.
//!
//! "Movie.mkv" -> "Movie (2).mkv", "Movie (3).mkv", ...
//! The stem is shortened when needed so the name stays within common
//! filename limits. Only current filesystem state is consulted; a racing
//! writer can still claim the name, and the executor's no-clobber placement
//! then fails with `TargetExists` instead of replacing it.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::trace;

#[cfg(windows)]
const MAX_FILENAME_LEN: usize = 240;
#[cfg(not(windows))]
const MAX_FILENAME_LEN: usize = 255;

const MAX_TRIES: u64 = 10_000;

/// First free path among `target`, `stem (2).ext`, `stem (3).ext`, ...
pub fn unique_destination(target: &Path) -> PathBuf {
    if !target.exists() {
        return target.to_path_buf();
    }
    let dir = target.parent().unwrap_or_else(|| Path::new(""));
    let Some(name) = target.file_name() else {
        return target.to_path_buf();
    };
    let base = Path::new(name);
    let stem = base.file_stem().unwrap_or(name);
    let ext = base.extension();

    for n in 2..=MAX_TRIES {
        let candidate = dir.join(name_with_suffix(stem, ext, &format!(" ({n})")));
        if !candidate.exists() {
            if n > 2 {
                trace!(dest = %candidate.display(), attempts = n - 1, "picked unique name");
            }
            return candidate;
        }
    }
    dir.join(name_with_suffix(stem, ext, " (final)"))
}

#[cfg(unix)]
fn name_len(s: &OsStr) -> usize {
    use std::os::unix::ffi::OsStrExt;
    s.as_bytes().len()
}

#[cfg(not(unix))]
fn name_len(s: &OsStr) -> usize {
    s.to_string_lossy().len()
}

/// `stem + suffix + [.ext]`, shortening the stem on a char boundary to fit.
fn name_with_suffix(stem: &OsStr, ext: Option<&OsStr>, suffix: &str) -> OsString {
    let overhead = suffix.len() + ext.map_or(0, |e| 1 + name_len(e));
    let budget = MAX_FILENAME_LEN.saturating_sub(overhead).max(1);

    let stem: OsString = if name_len(stem) <= budget {
        stem.to_os_string()
    } else {
        let lossy = stem.to_string_lossy();
        let mut end = 0;
        for (i, ch) in lossy.char_indices() {
            if i + ch.len_utf8() > budget {
                break;
            }
            end = i + ch.len_utf8();
        }
        let cut = &lossy[..end];
        OsString::from(if cut.is_empty() { "f" } else { cut })
    };

    let mut out = stem;
    out.push(suffix);
    if let Some(e) = ext {
        out.push(".");
        out.push(e);
    }
    out
}
