//! Orphaned partial-copy cleanup.
//! A crash during a cross-volume copy can leave a hidden
//! `.media_organizer.*.partial` file next to its intended target. The source is
//! still intact in that case, so the partial is pure garbage once it is older
//! than any copy that could still be running.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::platform::temp::is_partial_copy_name;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub bytes_reclaimed: u64,
    /// Partials younger than `min_age`, left alone.
    pub skipped_recent: usize,
    pub errors: usize,
}

pub fn sweep_orphaned_partials(dir: &Path, min_age: Duration) -> Result<SweepReport> {
    if !dir.is_dir() {
        anyhow::bail!("Sweep root is not a directory: '{}'", dir.display());
    }
    let cutoff = SystemTime::now().checked_sub(min_age).unwrap_or(SystemTime::UNIX_EPOCH);
    let mut report = SweepReport::default();

    for entry in WalkDir::new(dir).follow_links(false).into_iter() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "sweep: skipping unreadable entry");
                report.errors += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !is_partial_copy_name(name) {
            continue;
        }
        let meta = entry
            .metadata()
            .with_context(|| format!("stat '{}'", entry.path().display()))?;
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if modified > cutoff {
            debug!(path = %entry.path().display(), "sweep: partial too recent, leaving it");
            report.skipped_recent += 1;
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => {
                report.bytes_reclaimed += meta.len();
                report.removed.push(entry.into_path());
            }
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "sweep: failed to remove partial");
                report.errors += 1;
            }
        }
    }

    info!(
        root = %dir.display(),
        removed = report.removed.len(),
        bytes = report.bytes_reclaimed,
        skipped = report.skipped_recent,
        "orphan sweep finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::temp::partial_copy_path;
    use filetime::FileTime;

    fn age(path: &Path, secs: u64) {
        let t = SystemTime::now() - Duration::from_secs(secs);
        filetime::set_file_mtime(path, FileTime::from_system_time(t)).unwrap();
    }

    #[test]
    fn removes_only_old_partials() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("Movies").join("2024");
        fs::create_dir_all(&nested).unwrap();

        let old = partial_copy_path(&nested);
        fs::write(&old, vec![0u8; 10]).unwrap();
        age(&old, 7200);
        let fresh = partial_copy_path(dir.path());
        fs::write(&fresh, b"x").unwrap();
        let normal = nested.join("film.partial");
        fs::write(&normal, b"keep").unwrap();
        age(&normal, 7200);

        let r = sweep_orphaned_partials(dir.path(), Duration::from_secs(3600)).unwrap();
        assert_eq!(r.removed, vec![old.clone()]);
        assert_eq!(r.bytes_reclaimed, 10);
        assert_eq!(r.skipped_recent, 1);
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(normal.exists());
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(sweep_orphaned_partials(&dir.path().join("nope"), Duration::ZERO).is_err());
    }
}
