//! Value types passed between the engine components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// One request to place a file into the library. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub file_id: String,
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub create_directories: bool,
}

impl OperationRequest {
    pub fn new(
        file_id: impl Into<String>,
        source_path: impl Into<PathBuf>,
        target_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            source_path: source_path.into(),
            target_path: target_path.into(),
            create_directories: true,
        }
    }

    pub fn create_directories(mut self, yes: bool) -> Self {
        self.create_directories = yes;
        self
    }
}

/// Outcome of the pre-flight checks. Built once by the validator and read-only afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub(crate) is_valid: bool,
    pub(crate) errors: Vec<String>,
    pub(crate) warnings: Vec<String>,
    pub(crate) required_space_bytes: u64,
    pub(crate) available_space_bytes: u64,
    pub(crate) target_exists: bool,
    pub(crate) requires_directory_creation: bool,
    pub(crate) is_cross_volume: bool,
    #[serde(with = "duration_ms")]
    pub(crate) estimated_duration: Duration,
    #[serde(skip)]
    pub(crate) space_probed: bool,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
    pub fn required_space_bytes(&self) -> u64 {
        self.required_space_bytes
    }
    pub fn available_space_bytes(&self) -> u64 {
        self.available_space_bytes
    }
    pub fn target_exists(&self) -> bool {
        self.target_exists
    }
    pub fn requires_directory_creation(&self) -> bool {
        self.requires_directory_creation
    }
    pub fn is_cross_volume(&self) -> bool {
        self.is_cross_volume
    }
    pub fn estimated_duration(&self) -> Duration {
        self.estimated_duration
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Move,
}

/// Audit-grade description of a single attempt.
#[derive(Debug, Clone, Serialize)]
pub struct OperationRecord {
    pub operation_id: Uuid,
    pub file_id: String,
    pub kind: OperationKind,
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub success: bool,
    pub error_message: Option<String>,
    pub bytes_moved: u64,
    pub was_cross_volume: bool,
    pub directories_created: bool,
}

impl OperationRecord {
    pub(crate) fn start(file_id: &str, source: &Path, target: &Path) -> Self {
        Self {
            operation_id: Uuid::new_v4(),
            file_id: file_id.to_string(),
            kind: OperationKind::Move,
            source_path: source.to_path_buf(),
            target_path: target.to_path_buf(),
            started_at: Utc::now(),
            completed_at: None,
            success: false,
            error_message: None,
            bytes_moved: 0,
            was_cross_volume: false,
            directories_created: false,
        }
    }

    pub(crate) fn succeed(&mut self, bytes_moved: u64) {
        self.completed_at = Some(Utc::now());
        self.success = true;
        self.bytes_moved = bytes_moved;
        self.error_message = None;
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.completed_at = Some(Utc::now());
        self.success = false;
        self.bytes_moved = 0;
        self.error_message = Some(message.into());
    }

    /// Wall-clock time between start and completion (zero while still running).
    pub fn duration(&self) -> Duration {
        self.completed_at
            .and_then(|end| (end - self.started_at).to_std().ok())
            .unwrap_or_default()
    }
}

/// Registry entry for an operation currently holding a concurrency slot.
#[derive(Debug, Clone, Serialize)]
pub struct InFlightOperation {
    pub operation_id: Uuid,
    pub file_id: String,
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub cross_volume: bool,
}

/// Point-in-time view of the engine counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationStats {
    pub active_count: usize,
    pub completed_count: u64,
    pub failed_count: u64,
    pub success_rate_percent: f64,
    #[serde(with = "duration_ms")]
    pub average_duration: Duration,
    pub total_bytes_moved: u64,
    pub available_space_bytes: u64,
}

/// What to do when the target path is already occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Refuse the move; the existing file is left alone.
    #[default]
    Fail,
    /// Replace the existing file.
    Overwrite,
    /// Pick a unique sibling name.
    Rename,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictPolicy::Fail => "fail",
            ConflictPolicy::Overwrite => "overwrite",
            ConflictPolicy::Rename => "rename",
        })
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" | "skip" | "error" => Ok(ConflictPolicy::Fail),
            "overwrite" | "replace" => Ok(ConflictPolicy::Overwrite),
            "rename" | "unique" => Ok(ConflictPolicy::Rename),
            _ => Err(format!("invalid conflict policy: '{s}'")),
        }
    }
}

pub(crate) mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_lifecycle() {
        let mut rec = OperationRecord::start("f", Path::new("/a"), Path::new("/b"));
        assert!(rec.completed_at.is_none());
        assert_eq!(rec.duration(), Duration::ZERO);
        rec.succeed(42);
        assert!(rec.success);
        assert_eq!(rec.bytes_moved, 42);
        assert!(rec.completed_at.unwrap() >= rec.started_at);

        let mut failed = OperationRecord::start("g", Path::new("/a"), Path::new("/b"));
        failed.fail("boom");
        assert!(!failed.success);
        assert_eq!(failed.error_message.as_deref(), Some("boom"));
        assert_ne!(rec.operation_id, failed.operation_id);
    }

    #[test]
    fn conflict_policy_parse() {
        assert_eq!("Overwrite".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Overwrite);
        assert_eq!(" rename ".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Rename);
        assert_eq!("fail".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Fail);
        assert!("clobber".parse::<ConflictPolicy>().is_err());
    }
}
