//! Pre-flight validation.
//! Pure checks against the filesystem; nothing is created, moved or deleted.
//! Every expected problem ends up as an error or warning string in the result
//! so callers can show precise diagnostics.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::helpers::format_bytes;
use super::types::ValidationResult;
use super::volume::{VolumeProbe, existing_ancestor};

/// Reserve kept free on the target volume so the host OS is never starved.
pub const SAFETY_MARGIN_DEFAULT: u64 = 100 * 1024 * 1024;
/// Target paths longer than this (in bytes) get a warning.
pub const PATH_LENGTH_WARNING_DEFAULT: usize = 240;

const MAX_FILE_NAME_BYTES: usize = 255;
// Rough throughput for slow disks / network shares; only used for progress estimates.
const CROSS_VOLUME_BYTES_PER_SEC: f64 = 20.0 * 1024.0 * 1024.0;
const RENAME_ESTIMATE: Duration = Duration::from_millis(50);

pub struct ValidationEngine {
    volumes: Arc<dyn VolumeProbe>,
    safety_margin_bytes: u64,
    path_length_warning: usize,
}

impl ValidationEngine {
    pub fn new(volumes: Arc<dyn VolumeProbe>, safety_margin_bytes: u64, path_length_warning: usize) -> Self {
        Self {
            volumes,
            safety_margin_bytes,
            path_length_warning,
        }
    }

    pub fn safety_margin_bytes(&self) -> u64 {
        self.safety_margin_bytes
    }

    /// Run all checks in order. Never fails; see `ValidationResult::is_valid`.
    pub fn validate(&self, file_id: &str, source: &Path, target: &Path) -> ValidationResult {
        let mut r = ValidationResult::default();

        // 1) Source: exists, regular file, readable.
        let source_ok = self.check_source(source, &mut r);

        // 2) Target: well-formed, not the source, existing file is only a warning.
        let target_dir = match (target.file_name(), target.parent()) {
            (Some(_), Some(parent)) if parent.as_os_str().is_empty() => Some(Path::new(".")),
            (Some(_), Some(parent)) => Some(parent),
            _ => {
                r.errors.push(format!(
                    "Target path has no file name or parent directory: '{}'",
                    target.display()
                ));
                None
            }
        };
        if target_dir.is_some() {
            self.check_target(source, target, source_ok, &mut r);
        }

        // 3) Target directory.
        let probe_at = target_dir.and_then(|dir| self.check_target_dir(dir, &mut r));

        if let Some(probe_at) = probe_at.as_deref() {
            // 4) Free space on the target volume.
            self.check_space(probe_at, source_ok, &mut r);

            // 5) Same or different filesystem.
            if source_ok {
                self.check_volumes(source, probe_at, &mut r);
            }
        }

        // 6) Path length limits of stricter filesystems.
        self.check_path_length(target, &mut r);

        r.is_valid = r.errors.is_empty();
        debug!(
            file_id,
            src = %source.display(),
            dest = %target.display(),
            valid = r.is_valid,
            errors = r.errors.len(),
            warnings = r.warnings.len(),
            required = r.required_space_bytes,
            available = r.available_space_bytes,
            cross_volume = r.is_cross_volume,
            "validated move"
        );
        r
    }

    fn check_source(&self, source: &Path, r: &mut ValidationResult) -> bool {
        let meta = match fs::metadata(source) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                r.errors.push(format!("Source file does not exist: '{}'", source.display()));
                return false;
            }
            Err(e) => {
                r.errors.push(format!("Cannot access source file '{}': {}", source.display(), e));
                return false;
            }
        };
        if !meta.is_file() {
            r.errors.push(format!("Source is not a regular file: '{}'", source.display()));
            return false;
        }
        if let Err(e) = File::open(source) {
            r.errors.push(format!("Source file is not readable '{}': {}", source.display(), e));
            return false;
        }
        r.required_space_bytes = meta.len();
        true
    }

    fn check_target(&self, source: &Path, target: &Path, source_ok: bool, r: &mut ValidationResult) {
        match fs::metadata(target) {
            Ok(m) if m.is_dir() => {
                r.errors.push(format!("Target path is an existing directory: '{}'", target.display()));
            }
            Ok(_) => {
                let same = source_ok
                    && matches!(
                        (dunce::canonicalize(source), dunce::canonicalize(target)),
                        (Ok(a), Ok(b)) if a == b
                    );
                if same {
                    r.errors.push(format!("Target is the source file itself: '{}'", target.display()));
                } else {
                    r.target_exists = true;
                    r.warnings.push(format!("Target file already exists: '{}'", target.display()));
                }
            }
            Err(_) => {}
        }
    }

    /// Returns the directory to probe for space/volume: the target dir itself or
    /// its closest existing ancestor.
    fn check_target_dir(&self, dir: &Path, r: &mut ValidationResult) -> Option<std::path::PathBuf> {
        match fs::metadata(dir) {
            Ok(m) if m.is_dir() => Some(dir.to_path_buf()),
            Ok(_) => {
                r.errors.push(format!("Target parent exists but is not a directory: '{}'", dir.display()));
                None
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                r.requires_directory_creation = true;
                let ancestor = existing_ancestor(dir)?;
                if ancestor.is_dir() {
                    Some(ancestor)
                } else {
                    r.errors.push(format!(
                        "Cannot create '{}': '{}' is not a directory",
                        dir.display(),
                        ancestor.display()
                    ));
                    None
                }
            }
            Err(e) => {
                r.errors.push(format!("Cannot access target directory '{}': {}", dir.display(), e));
                None
            }
        }
    }

    fn check_space(&self, probe_at: &Path, source_ok: bool, r: &mut ValidationResult) {
        match self.volumes.available_space(probe_at) {
            Ok(available) => {
                r.available_space_bytes = available;
                r.space_probed = true;
                let needed = r.required_space_bytes.saturating_add(self.safety_margin_bytes);
                if source_ok && available < needed {
                    r.errors.push(format!(
                        "Insufficient space on target volume '{}': need {} ({} file + {} reserve), available {}",
                        probe_at.display(),
                        format_bytes(needed),
                        format_bytes(r.required_space_bytes),
                        format_bytes(self.safety_margin_bytes),
                        format_bytes(available)
                    ));
                }
            }
            Err(e) => {
                r.warnings.push(format!(
                    "Could not determine free space at '{}': {}; space check skipped",
                    probe_at.display(),
                    e
                ));
            }
        }
    }

    fn check_volumes(&self, source: &Path, probe_at: &Path, r: &mut ValidationResult) {
        match (self.volumes.volume_id(source), self.volumes.volume_id(probe_at)) {
            (Ok(a), Ok(b)) => r.is_cross_volume = a != b,
            (Err(e), _) | (_, Err(e)) => {
                // copy+delete works everywhere; rename does not.
                r.is_cross_volume = true;
                r.warnings.push(format!(
                    "Could not determine volume identity ({e}); assuming a cross-volume copy"
                ));
            }
        }
        r.estimated_duration = if r.is_cross_volume {
            Duration::from_secs_f64(r.required_space_bytes as f64 / CROSS_VOLUME_BYTES_PER_SEC)
                .max(RENAME_ESTIMATE)
        } else {
            RENAME_ESTIMATE
        };
    }

    fn check_path_length(&self, target: &Path, r: &mut ValidationResult) {
        let len = target.as_os_str().len();
        if len > self.path_length_warning {
            r.warnings.push(format!(
                "Target path is {len} bytes long; some filesystems limit paths to {}",
                self.path_length_warning
            ));
        }
        if let Some(name) = target.file_name()
            && name.len() > MAX_FILE_NAME_BYTES
        {
            r.warnings.push(format!(
                "Target file name is {} bytes long; most filesystems allow {MAX_FILE_NAME_BYTES}",
                name.len()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::VolumeId;
    use std::path::PathBuf;

    struct Fixed {
        available: u64,
        split_at: Option<PathBuf>,
    }

    impl VolumeProbe for Fixed {
        fn volume_id(&self, path: &Path) -> io::Result<VolumeId> {
            match &self.split_at {
                Some(root) if path.starts_with(root) => Ok(VolumeId::Device(2)),
                _ => Ok(VolumeId::Device(1)),
            }
        }
        fn available_space(&self, _path: &Path) -> io::Result<u64> {
            Ok(self.available)
        }
    }

    fn engine(available: u64, margin: u64) -> ValidationEngine {
        ValidationEngine::new(Arc::new(Fixed { available, split_at: None }), margin, 240)
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let r = engine(u64::MAX, 0).validate("f", &dir.path().join("nope"), &dir.path().join("t"));
        assert!(!r.is_valid());
        assert!(r.errors()[0].contains("does not exist"));
    }

    #[test]
    fn space_boundary_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.bin");
        fs::write(&src, vec![0u8; 1000]).unwrap();
        let target = dir.path().join("b.bin");

        let ok = engine(1000 + 500, 500).validate("f", &src, &target);
        assert!(ok.is_valid(), "{:?}", ok.errors());
        assert_eq!(ok.required_space_bytes(), 1000);

        let short = engine(1000 + 500 - 1, 500).validate("f", &src, &target);
        assert!(!short.is_valid());
        assert!(short.errors().iter().any(|e| e.contains("Insufficient space")));
        assert_eq!(short.available_space_bytes(), 1499);
    }

    #[test]
    fn existing_target_is_a_warning_only() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.mp3");
        let target = dir.path().join("b.mp3");
        fs::write(&src, b"a").unwrap();
        fs::write(&target, b"b").unwrap();
        let r = engine(u64::MAX, 0).validate("f", &src, &target);
        assert!(r.is_valid());
        assert!(r.target_exists());
        assert_eq!(r.warnings().len(), 1);
    }

    #[test]
    fn target_equal_to_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.mp3");
        fs::write(&src, b"a").unwrap();
        let r = engine(u64::MAX, 0).validate("f", &src, &src);
        assert!(!r.is_valid());
    }

    #[test]
    fn missing_directory_is_flagged_not_failed() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.flac");
        fs::write(&src, b"abc").unwrap();
        let target = dir.path().join("Music").join("Jazz").join("a.flac");
        let r = engine(u64::MAX, 0).validate("f", &src, &target);
        assert!(r.is_valid());
        assert!(r.requires_directory_creation());
        assert!(!r.is_cross_volume());
    }

    #[test]
    fn file_in_the_way_of_target_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.flac");
        fs::write(&src, b"abc").unwrap();
        fs::write(dir.path().join("Music"), b"not a dir").unwrap();
        let r = engine(u64::MAX, 0).validate("f", &src, &dir.path().join("Music").join("x").join("a.flac"));
        assert!(!r.is_valid());
    }

    #[test]
    fn cross_volume_detected_and_estimated() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in").join("clip.mp4");
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, vec![1u8; 4096]).unwrap();
        let lib = dir.path().join("lib");
        fs::create_dir_all(&lib).unwrap();
        let probe = Fixed { available: u64::MAX, split_at: Some(lib.clone()) };
        let v = ValidationEngine::new(Arc::new(probe), 0, 240);
        let r = v.validate("f", &src, &lib.join("clip.mp4"));
        assert!(r.is_cross_volume());
        assert!(r.estimated_duration() >= RENAME_ESTIMATE);
    }

    #[test]
    fn long_paths_warn() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a");
        fs::write(&src, b"x").unwrap();
        let v = ValidationEngine::new(Arc::new(Fixed { available: u64::MAX, split_at: None }), 0, 10);
        let r = v.validate("f", &src, &dir.path().join("a-rather-long-name.txt"));
        assert!(r.is_valid());
        assert!(r.warnings().iter().any(|w| w.contains("bytes long")));
    }
}
