//! Default path helpers and symlink checks.

use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file (or a directory holding config.xml).
pub const CONFIG_ENV_VAR: &str = "MEDIA_ORGANIZER_CONFIG";
const APP_DIR: &str = "media_organizer";

/// Config path: `$MEDIA_ORGANIZER_CONFIG` when set, else the per-OS config dir.
/// Relative overrides resolve against the current directory.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        let mut p = PathBuf::from(p);
        if p.is_relative()
            && let Ok(cwd) = env::current_dir()
        {
            p = cwd.join(p);
        }
        if p.is_dir() {
            p.push("config.xml");
        }
        return Some(p);
    }
    let base = config_dir().or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join(APP_DIR).join("config.xml"))
}

/// Suggested log file location (per-OS data dir). Nothing is created.
pub fn default_log_path() -> Option<PathBuf> {
    let base = data_dir().or_else(|| {
        env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share"))
    })?;
    Some(base.join(APP_DIR).join("media_organizer.log"))
}

/// True if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.as_os_str().is_empty() {
            break;
        }
        match fs::symlink_metadata(anc) {
            Ok(meta) if meta.file_type().is_symlink() => return Ok(true),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        p = anc.parent();
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_dirs_have_no_symlink_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a").join("b.log");
        assert!(!path_has_symlink_ancestor(&p).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_parent_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        assert!(path_has_symlink_ancestor(&link.join("audit.jsonl")).unwrap());
    }

    #[test]
    fn log_path_is_under_app_dir() {
        if let Some(p) = default_log_path() {
            assert!(p.ends_with("media_organizer/media_organizer.log"));
        }
    }
}
