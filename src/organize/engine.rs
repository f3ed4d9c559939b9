//! The governed entry point.
//! `organize` runs every request through the same fixed sequence:
//! validate, resolve conflicts, materialize directories, execute under the
//! governor, record, update stats. Each attempt yields exactly one audit entry
//! and one stats update, whatever happens in between.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::catalog::FileCatalog;
use super::duplicate::unique_destination;
use super::executor::{MoveExecutor, MoveOutcome, MoveStrategy};
use super::governor::ConcurrencyGovernor;
use super::materialize::DirectoryMaterializer;
use super::recorder::{AuditSink, JsonlAuditSink, OperationRecorder, TracingAuditSink};
use super::stats::StatsAggregator;
use super::types::{
    ConflictPolicy, InFlightOperation, OperationRecord, OperationRequest, OperationStats, ValidationResult,
};
use super::validate::ValidationEngine;
use super::volume::{SystemVolumes, VolumeProbe};
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::errors::OrganizeError;

pub struct OrganizeEngine {
    validator: ValidationEngine,
    materializer: DirectoryMaterializer,
    executor: MoveExecutor,
    governor: ConcurrencyGovernor,
    recorder: OperationRecorder,
    stats: StatsAggregator,
    catalog: Option<Arc<dyn FileCatalog>>,
    on_conflict: ConflictPolicy,
}

pub struct OrganizeEngineBuilder {
    config: Config,
    volumes: Option<Arc<dyn VolumeProbe>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    catalog: Option<Arc<dyn FileCatalog>>,
}

impl OrganizeEngineBuilder {
    pub fn volumes(mut self, volumes: Arc<dyn VolumeProbe>) -> Self {
        self.volumes = Some(volumes);
        self
    }

    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn FileCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Opens the configured audit file unless a sink was supplied.
    pub fn build(self) -> Result<OrganizeEngine, OrganizeError> {
        let c = self.config;
        let sink: Arc<dyn AuditSink> = match (self.audit_sink, &c.audit_log) {
            (Some(s), _) => s,
            (None, Some(path)) => Arc::new(JsonlAuditSink::open(path).map_err(OrganizeError::AuditWrite)?),
            (None, None) => Arc::new(TracingAuditSink),
        };
        let volumes = self.volumes.unwrap_or_else(|| Arc::new(SystemVolumes));
        Ok(OrganizeEngine {
            validator: ValidationEngine::new(volumes, c.safety_margin_bytes, c.path_length_warning),
            materializer: DirectoryMaterializer::new(),
            executor: MoveExecutor::new(c.copy_chunk_size, c.preserve_metadata),
            governor: ConcurrencyGovernor::new(c.max_concurrent_moves),
            recorder: OperationRecorder::new(sink),
            stats: StatsAggregator::new(c.stats_window),
            catalog: self.catalog,
            on_conflict: c.on_conflict,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

fn target_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

impl OrganizeEngine {
    pub fn builder(config: &Config) -> OrganizeEngineBuilder {
        OrganizeEngineBuilder {
            config: config.clone(),
            volumes: None,
            audit_sink: None,
            catalog: None,
        }
    }

    /// Pre-flight checks only; nothing on disk changes.
    pub fn validate(&self, file_id: &str, source: &Path, target: &Path) -> ValidationResult {
        let r = self.validator.validate(file_id, source, target);
        if r.space_probed {
            self.stats.observe_available_space(r.available_space_bytes);
        }
        r
    }

    pub fn organize(&self, req: &OperationRequest, cancel: &CancelToken) -> Result<OperationRecord, OrganizeError> {
        let started = Instant::now();
        let mut rec = OperationRecord::start(&req.file_id, &req.source_path, &req.target_path);
        self.stats.record_started();

        // A panic in a collaborator still ends as one recorded, failed attempt.
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_steps(req, &mut rec, cancel)))
            .unwrap_or_else(|payload| Err(OrganizeError::Internal(panic_message(payload.as_ref()))));
        match &result {
            Ok(outcome) => rec.succeed(outcome.bytes_moved),
            Err(e) => rec.fail(e.to_string()),
        }
        self.finish(&rec, started, result.as_ref().err());
        result.map(|_| rec)
    }

    /// Organize a file known to the catalog by id.
    pub fn organize_by_id(
        &self,
        file_id: &str,
        target: &Path,
        create_directories: bool,
        cancel: &CancelToken,
    ) -> Result<OperationRecord, OrganizeError> {
        let started = Instant::now();
        let located = panic::catch_unwind(AssertUnwindSafe(|| {
            self.catalog.as_ref().and_then(|c| c.locate(file_id))
        }));
        let err = match located {
            Ok(Some(source)) => {
                let req = OperationRequest::new(file_id, source, target).create_directories(create_directories);
                return self.organize(&req, cancel);
            }
            Ok(None) => OrganizeError::UnknownFile(file_id.to_string()),
            Err(payload) => OrganizeError::Internal(panic_message(payload.as_ref())),
        };
        let mut rec = OperationRecord::start(file_id, Path::new(""), target);
        self.stats.record_started();
        rec.fail(err.to_string());
        self.finish(&rec, started, Some(&err));
        Err(err)
    }

    pub fn stats(&self) -> OperationStats {
        self.stats.snapshot()
    }

    pub fn in_flight(&self) -> Vec<InFlightOperation> {
        self.governor.in_flight()
    }

    /// Stop accepting work. Moves already holding a slot run to completion.
    pub fn shutdown(&self) {
        info!("organize engine shutting down");
        self.governor.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.governor.is_shut_down()
    }

    fn run_steps(
        &self,
        req: &OperationRequest,
        rec: &mut OperationRecord,
        cancel: &CancelToken,
    ) -> Result<MoveOutcome, OrganizeError> {
        if self.governor.is_shut_down() {
            return Err(OrganizeError::ShuttingDown);
        }
        cancel.check()?;

        let v = self.validate(&req.file_id, &req.source_path, &req.target_path);
        rec.was_cross_volume = v.is_cross_volume;
        for w in &v.warnings {
            warn!(file_id = %req.file_id, "{w}");
        }
        if !v.is_valid {
            return Err(OrganizeError::Validation {
                file_id: req.file_id.clone(),
                errors: v.errors,
            });
        }

        let (target, replace) = self.resolve_conflict(&req.target_path, v.target_exists)?;
        rec.target_path = target.clone();

        if v.requires_directory_creation {
            let dir = target_dir(&target);
            if !req.create_directories {
                return Err(OrganizeError::Validation {
                    file_id: req.file_id.clone(),
                    errors: vec![format!(
                        "Target directory does not exist and directory creation is disabled: '{}'",
                        dir.display()
                    )],
                });
            }
            let made = self.materializer.ensure_directory(dir)?;
            rec.directories_created = !made.created.is_empty();
        }

        let op = InFlightOperation {
            operation_id: rec.operation_id,
            file_id: req.file_id.clone(),
            source_path: req.source_path.clone(),
            target_path: target.clone(),
            started_at: rec.started_at,
            cross_volume: v.is_cross_volume,
        };
        let outcome = self.governor.run(op, cancel, || {
            self.executor.execute(
                &req.source_path,
                &target,
                v.is_cross_volume,
                v.required_space_bytes,
                replace,
                cancel,
            )
        })?;
        rec.was_cross_volume = outcome.strategy == MoveStrategy::CopyDelete;
        Ok(outcome)
    }

    /// Final target path and whether an existing file there may be replaced.
    fn resolve_conflict(&self, target: &Path, exists: bool) -> Result<(PathBuf, bool), OrganizeError> {
        if !exists {
            return Ok((target.to_path_buf(), false));
        }
        match self.on_conflict {
            ConflictPolicy::Fail => Err(OrganizeError::TargetExists(target.to_path_buf())),
            ConflictPolicy::Overwrite => {
                info!(dest = %target.display(), "replacing existing target");
                Ok((target.to_path_buf(), true))
            }
            ConflictPolicy::Rename => {
                let unique = unique_destination(target);
                info!(requested = %target.display(), dest = %unique.display(), "target exists; using a unique name");
                Ok((unique, false))
            }
        }
    }

    fn finish(&self, rec: &OperationRecord, started: Instant, err: Option<&OrganizeError>) {
        match err {
            None => info!(
                operation_id = %rec.operation_id,
                file_id = %rec.file_id,
                dest = %rec.target_path.display(),
                bytes = rec.bytes_moved,
                cross_volume = rec.was_cross_volume,
                "file organized"
            ),
            Some(e) => warn!(
                operation_id = %rec.operation_id,
                file_id = %rec.file_id,
                code = e.code(),
                kind = e.kind(),
                error = %e,
                "file organization failed"
            ),
        }
        if let Err(e) = self.recorder.record(rec) {
            warn!(operation_id = %rec.operation_id, error = %e, "audit entry lost");
        }
        self.stats.update(rec.success, started.elapsed(), rec.bytes_moved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organize::catalog::MemoryCatalog;
    use crate::organize::recorder::MemoryAuditSink;
    use crate::platform::VolumeId;
    use std::fs;
    use std::io;

    struct Roomy;
    impl VolumeProbe for Roomy {
        fn volume_id(&self, _: &Path) -> io::Result<VolumeId> {
            Ok(VolumeId::Device(1))
        }
        fn available_space(&self, _: &Path) -> io::Result<u64> {
            Ok(u64::MAX / 2)
        }
    }

    fn engine(policy: ConflictPolicy) -> (OrganizeEngine, Arc<MemoryAuditSink>) {
        let sink = Arc::new(MemoryAuditSink::new());
        let cfg = Config {
            on_conflict: policy,
            ..Config::default()
        };
        let e = OrganizeEngine::builder(&cfg)
            .volumes(Arc::new(Roomy))
            .audit_sink(sink.clone())
            .build()
            .unwrap();
        (e, sink)
    }

    struct Exploding;
    impl VolumeProbe for Exploding {
        fn volume_id(&self, _: &Path) -> io::Result<VolumeId> {
            panic!("volume table corrupted")
        }
        fn available_space(&self, _: &Path) -> io::Result<u64> {
            Ok(u64::MAX / 2)
        }
    }

    #[test]
    fn panicking_collaborator_is_recorded_as_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.mkv");
        fs::write(&src, b"12345").unwrap();
        let sink = Arc::new(MemoryAuditSink::new());
        let e = OrganizeEngine::builder(&Config::default())
            .volumes(Arc::new(Exploding))
            .audit_sink(sink.clone())
            .build()
            .unwrap();

        let err = e
            .organize(&OperationRequest::new("m1", &src, dir.path().join("out.mkv")), &CancelToken::new())
            .unwrap_err();
        match &err {
            OrganizeError::Internal(msg) => assert!(msg.contains("volume table corrupted")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.kind(), "internal");
        assert!(src.exists());
        assert_eq!(sink.entries().len(), 1);
        let s = e.stats();
        assert_eq!((s.completed_count, s.failed_count, s.active_count), (0, 1, 0));
        assert!(e.in_flight().is_empty());
    }

    #[test]
    fn same_volume_move_with_directory_creation() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.mkv");
        fs::write(&src, b"12345").unwrap();
        let target = dir.path().join("Movies").join("2024").join("in.mkv");
        let (e, sink) = engine(ConflictPolicy::Fail);

        let rec = e
            .organize(&OperationRequest::new("m1", &src, &target), &CancelToken::new())
            .unwrap();
        assert!(rec.success);
        assert!(rec.directories_created);
        assert!(!rec.was_cross_volume);
        assert_eq!(rec.bytes_moved, 5);
        assert!(!src.exists());
        assert_eq!(fs::read(&target).unwrap(), b"12345");
        assert_eq!(sink.entries().len(), 1);
        let s = e.stats();
        assert_eq!((s.completed_count, s.failed_count, s.active_count), (1, 0, 0));
        assert_eq!(s.total_bytes_moved, 5);
    }

    #[test]
    fn conflict_policies() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("song.mp3");
        fs::write(&target, b"old").unwrap();

        let src = dir.path().join("a.mp3");
        fs::write(&src, b"new").unwrap();
        let (fail, _) = engine(ConflictPolicy::Fail);
        let err = fail
            .organize(&OperationRequest::new("s", &src, &target), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, OrganizeError::TargetExists(_)));
        assert!(src.exists());

        let (rename, _) = engine(ConflictPolicy::Rename);
        let rec = rename
            .organize(&OperationRequest::new("s", &src, &target), &CancelToken::new())
            .unwrap();
        assert_eq!(rec.target_path, dir.path().join("song (2).mp3"));
        assert_eq!(fs::read(&target).unwrap(), b"old");

        let src2 = dir.path().join("b.mp3");
        fs::write(&src2, b"newer").unwrap();
        let (overwrite, _) = engine(ConflictPolicy::Overwrite);
        overwrite
            .organize(&OperationRequest::new("s2", &src2, &target), &CancelToken::new())
            .unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"newer");
    }

    #[test]
    fn missing_directory_without_creation_is_a_validation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a");
        fs::write(&src, b"x").unwrap();
        let target = dir.path().join("nope").join("a");
        let (e, sink) = engine(ConflictPolicy::Fail);
        let req = OperationRequest::new("f", &src, &target).create_directories(false);
        let err = e.organize(&req, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, OrganizeError::Validation { .. }));
        assert!(!dir.path().join("nope").exists());
        assert_eq!(sink.entries().len(), 1);
        assert_eq!(e.stats().failed_count, 1);
    }

    #[test]
    fn by_id_uses_catalog_and_records_unknown_ids() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.flac");
        fs::write(&src, b"flac").unwrap();
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.insert("known", &src);
        let sink = Arc::new(MemoryAuditSink::new());
        let e = OrganizeEngine::builder(&Config::default())
            .volumes(Arc::new(Roomy))
            .audit_sink(sink.clone())
            .catalog(catalog)
            .build()
            .unwrap();

        let target = dir.path().join("Music").join("a.flac");
        e.organize_by_id("known", &target, true, &CancelToken::new()).unwrap();
        assert!(target.exists());

        let err = e
            .organize_by_id("ghost", &target, true, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, OrganizeError::UnknownFile(_)));
        assert_eq!(sink.entries().len(), 2);
        assert_eq!(e.stats().failed_count, 1);
    }

    struct BrokenCatalog;
    impl FileCatalog for BrokenCatalog {
        fn locate(&self, _: &str) -> Option<PathBuf> {
            panic!("catalog index unreadable")
        }
    }

    #[test]
    fn panicking_catalog_is_recorded_as_a_failure() {
        let sink = Arc::new(MemoryAuditSink::new());
        let e = OrganizeEngine::builder(&Config::default())
            .volumes(Arc::new(Roomy))
            .audit_sink(sink.clone())
            .catalog(Arc::new(BrokenCatalog))
            .build()
            .unwrap();
        let err = e
            .organize_by_id("any", Path::new("/lib/a.flac"), true, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, OrganizeError::Internal(_)));
        assert_eq!(sink.entries().len(), 1);
        assert_eq!((e.stats().failed_count, e.stats().active_count), (1, 0));
    }

    #[test]
    fn shutdown_refuses_new_work() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a");
        fs::write(&src, b"x").unwrap();
        let (e, sink) = engine(ConflictPolicy::Fail);
        e.shutdown();
        let err = e
            .organize(&OperationRequest::new("f", &src, dir.path().join("b")), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, OrganizeError::ShuttingDown));
        assert!(src.exists());
        assert_eq!(sink.entries().len(), 1);
    }
}
