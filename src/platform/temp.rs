//! Unique hidden sibling names for temp files.
//! Used for atomic config writes and for in-progress cross-volume copies.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// File name prefix shared by every temp file this crate creates.
pub const TEMP_PREFIX: &str = ".media_organizer.";
/// Suffix marking an in-progress cross-volume copy.
pub const PARTIAL_SUFFIX: &str = ".partial";

fn unique_stem() -> String {
    let pid = std::process::id();
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{pid}.{nanos}.{seq}")
}

/// Pattern: .media_organizer.config.tmp.<pid>.<nanos>.<seq>
pub fn tmp_config_sibling_name(target: &Path) -> PathBuf {
    let name = format!("{TEMP_PREFIX}config.tmp.{}", unique_stem());
    target.parent().unwrap_or_else(|| Path::new(".")).join(name)
}

/// Pattern: <dir>/.media_organizer.<pid>.<nanos>.<seq>.partial
pub fn partial_copy_path(dir: &Path) -> PathBuf {
    dir.join(format!("{TEMP_PREFIX}{}{PARTIAL_SUFFIX}", unique_stem()))
}

/// True for names produced by `partial_copy_path`.
pub fn is_partial_copy_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(PARTIAL_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn uniqueness_concurrent() {
        let dir = Path::new("library");
        let mut handles = Vec::new();
        for _ in 0..32 {
            let d = dir.to_path_buf();
            handles.push(thread::spawn(move || partial_copy_path(&d)));
        }
        let mut seen = HashSet::new();
        for h in handles {
            let p = h.join().unwrap();
            assert!(seen.insert(p), "duplicate temp name generated");
        }
    }

    #[test]
    fn partial_names_are_recognised() {
        let p = partial_copy_path(Path::new("/lib"));
        let name = p.file_name().unwrap().to_str().unwrap();
        assert!(is_partial_copy_name(name));
        assert!(!is_partial_copy_name("movie.partial"));
        let cfg = tmp_config_sibling_name(Path::new("/etc/x/config.xml"));
        assert!(!is_partial_copy_name(cfg.file_name().unwrap().to_str().unwrap()));
    }
}
