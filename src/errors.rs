//! Typed error definitions for media_organizer.
//! Every public engine entry point returns one of these; callers can match on
//! the variant or use `code()`/`kind()` for structured logs.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("validation failed for '{file_id}': {}", errors.join("; "))]
    Validation { file_id: String, errors: Vec<String> },

    #[error("target already exists: {0}")]
    TargetExists(PathBuf),

    #[error("failed to create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source file missing: {0}")]
    SourceMissing(PathBuf),

    #[error("source file {path} changed size since validation: expected {expected} bytes, found {actual}")]
    SourceChanged {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("move failed {from} -> {to}: {error}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("verification failed for {path}: expected {expected} bytes, found {actual}")]
    VerificationFailed {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("engine is shutting down")]
    ShuttingDown,

    #[error("no catalog entry for file id '{0}'")]
    UnknownFile(String),

    #[error("failed to write audit entry: {0}")]
    AuditWrite(#[source] io::Error),

    /// A panic inside the engine or a host-supplied collaborator.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OrganizeError {
    /// Stable numeric code for logs and exit statuses.
    pub fn code(&self) -> i32 {
        match self {
            OrganizeError::Validation { .. } => 10,
            OrganizeError::TargetExists(_) => 11,
            OrganizeError::DirectoryCreation { .. } => 12,
            OrganizeError::SourceMissing(_) => 20,
            OrganizeError::SourceChanged { .. } => 21,
            OrganizeError::MoveFailed { .. } => 22,
            OrganizeError::VerificationFailed { .. } => 23,
            OrganizeError::Cancelled => 30,
            OrganizeError::ShuttingDown => 31,
            OrganizeError::UnknownFile(_) => 40,
            OrganizeError::AuditWrite(_) => 50,
            OrganizeError::Internal(_) => 60,
        }
    }

    /// Short snake_case tag, used as the `kind` field in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OrganizeError::Validation { .. } => "validation",
            OrganizeError::TargetExists(_) => "target_exists",
            OrganizeError::DirectoryCreation { .. } => "directory_creation",
            OrganizeError::SourceMissing(_) => "source_missing",
            OrganizeError::SourceChanged { .. } => "source_changed",
            OrganizeError::MoveFailed { .. } => "move_failed",
            OrganizeError::VerificationFailed { .. } => "verification_failed",
            OrganizeError::Cancelled => "cancelled",
            OrganizeError::ShuttingDown => "shutting_down",
            OrganizeError::UnknownFile(_) => "unknown_file",
            OrganizeError::AuditWrite(_) => "audit_write",
            OrganizeError::Internal(_) => "internal",
        }
    }

    /// True for failures detected before anything on disk was touched.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            OrganizeError::Validation { .. }
                | OrganizeError::TargetExists(_)
                | OrganizeError::DirectoryCreation { .. }
                | OrganizeError::UnknownFile(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_joins_errors() {
        let e = OrganizeError::Validation {
            file_id: "f1".into(),
            errors: vec!["a".into(), "b".into()],
        };
        assert_eq!(e.to_string(), "validation failed for 'f1': a; b");
        assert_eq!(e.kind(), "validation");
        assert!(e.is_preflight());
    }

    #[test]
    fn move_failed_exposes_io_source() {
        use std::error::Error as _;
        let e = OrganizeError::MoveFailed {
            from: "/a".into(),
            to: "/b".into(),
            error: io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        };
        assert!(e.source().is_some());
        assert_eq!(e.code(), 22);
        assert!(!e.is_preflight());
    }
}
