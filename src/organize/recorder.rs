//! Operation audit trail.
//! Every attempt, successful or not, becomes one `AuditEntry` handed to an
//! append-only sink. Sinks must tolerate concurrent callers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};
use uuid::Uuid;

use super::helpers::io_error_with_help;
use super::types::OperationRecord;
use crate::errors::OrganizeError;
use crate::platform::open_log_file_secure_append;

pub const AUDIT_CATEGORY: &str = "file_organization";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub operation_id: Uuid,
    pub file_id: String,
    pub category: &'static str,
    pub level: AuditLevel,
    pub message: String,
    pub detail: Option<String>,
    pub duration_ms: u64,
    pub bytes_moved: u64,
    pub was_cross_volume: bool,
    pub directories_created: bool,
    pub source_path: PathBuf,
    pub target_path: PathBuf,
}

impl AuditEntry {
    pub fn from_record(rec: &OperationRecord) -> Self {
        let (level, message) = if rec.success {
            (
                AuditLevel::Info,
                format!(
                    "Moved '{}' to '{}' ({} bytes{})",
                    rec.source_path.display(),
                    rec.target_path.display(),
                    rec.bytes_moved,
                    if rec.was_cross_volume { ", cross-volume" } else { "" }
                ),
            )
        } else {
            (
                AuditLevel::Error,
                format!("Failed to move '{}' to '{}'", rec.source_path.display(), rec.target_path.display()),
            )
        };
        Self {
            timestamp: rec.completed_at.unwrap_or_else(Utc::now),
            operation_id: rec.operation_id,
            file_id: rec.file_id.clone(),
            category: AUDIT_CATEGORY,
            level,
            message,
            detail: rec.error_message.clone(),
            duration_ms: rec.duration().as_millis() as u64,
            bytes_moved: rec.bytes_moved,
            was_cross_volume: rec.was_cross_volume,
            directories_created: rec.directories_created,
            source_path: rec.source_path.clone(),
            target_path: rec.target_path.clone(),
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &AuditEntry) -> io::Result<()>;
}

/// Append-only JSON-lines file. One line per entry, flushed immediately.
pub struct JsonlAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditSink {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_error_with_help("create audit directory", parent))?;
        }
        let file = open_log_file_secure_append(path).map_err(io_error_with_help("open audit log", path))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn append(&self, entry: &AuditEntry) -> io::Result<()> {
        let mut line = serde_json::to_vec(entry).map_err(io::Error::other)?;
        line.push(b'\n');
        let mut f = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        // A single write keeps lines from concurrent processes from interleaving.
        f.write_all(&line)?;
        f.flush()
    }
}

/// Keeps entries in memory; for embedding hosts that forward them elsewhere.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, entry: &AuditEntry) -> io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}

/// Emits entries as `tracing` events on the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn append(&self, e: &AuditEntry) -> io::Result<()> {
        match e.level {
            AuditLevel::Info => info!(
                target: "audit",
                operation_id = %e.operation_id,
                file_id = %e.file_id,
                category = e.category,
                duration_ms = e.duration_ms,
                bytes = e.bytes_moved,
                cross_volume = e.was_cross_volume,
                "{}", e.message
            ),
            AuditLevel::Error => error!(
                target: "audit",
                operation_id = %e.operation_id,
                file_id = %e.file_id,
                category = e.category,
                duration_ms = e.duration_ms,
                detail = e.detail.as_deref().unwrap_or(""),
                "{}", e.message
            ),
        }
        Ok(())
    }
}

pub struct OperationRecorder {
    sink: Arc<dyn AuditSink>,
}

impl OperationRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub fn record(&self, rec: &OperationRecord) -> Result<(), OrganizeError> {
        self.sink
            .append(&AuditEntry::from_record(rec))
            .map_err(OrganizeError::AuditWrite)
    }
}
