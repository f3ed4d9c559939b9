#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use media_organizer::organize::MemoryAuditSink;
use media_organizer::{Config, OrganizeEngine, VolumeId, VolumeProbe};

/// Volume probe with scripted answers: paths under `secondary` report a second
/// device, and free space is whatever the test says.
pub struct FakeVolumes {
    secondary: Option<PathBuf>,
    available: Mutex<u64>,
    fail_space: bool,
}

impl FakeVolumes {
    pub fn roomy() -> Self {
        Self {
            secondary: None,
            available: Mutex::new(u64::MAX / 2),
            fail_space: false,
        }
    }

    /// Everything under `root` lives on a different volume.
    pub fn split_at(root: &Path) -> Self {
        Self {
            secondary: Some(root.to_path_buf()),
            ..Self::roomy()
        }
    }

    pub fn with_available(self, bytes: u64) -> Self {
        *self.available.lock().unwrap() = bytes;
        self
    }

    pub fn failing_space_probe(mut self) -> Self {
        self.fail_space = true;
        self
    }
}

impl VolumeProbe for FakeVolumes {
    fn volume_id(&self, path: &Path) -> io::Result<VolumeId> {
        match &self.secondary {
            Some(root) if path.starts_with(root) => Ok(VolumeId::Device(2)),
            _ => Ok(VolumeId::Device(1)),
        }
    }

    fn available_space(&self, _path: &Path) -> io::Result<u64> {
        if self.fail_space {
            return Err(io::Error::other("statvfs not supported"));
        }
        Ok(*self.available.lock().unwrap())
    }
}

pub fn engine_with(cfg: &Config, volumes: FakeVolumes) -> (OrganizeEngine, Arc<MemoryAuditSink>) {
    let sink = Arc::new(MemoryAuditSink::new());
    let engine = OrganizeEngine::builder(cfg)
        .volumes(Arc::new(volumes))
        .audit_sink(sink.clone())
        .build()
        .unwrap();
    (engine, sink)
}

pub fn write_file(path: &Path, len: usize) -> Vec<u8> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    std::fs::write(path, &data).unwrap();
    data
}

/// Hidden partial-copy files anywhere under `dir`.
pub fn partials_under(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(media_organizer::platform::temp::is_partial_copy_name)
        })
        .map(|e| e.into_path())
        .collect()
}
