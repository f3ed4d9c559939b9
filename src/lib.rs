//! Core library for `media_organizer`.
//!
//! Places media files into a library tree without ever losing one: every move
//! is validated first, bounded by a concurrency governor, executed atomically
//! (rename, or copy+verify+delete across volumes) and recorded in an audit trail.
//!
//! Entry point: [`OrganizeEngine`]. The building blocks are public for hosts
//! that want to compose them differently.

pub mod cancel;
pub mod config;
pub mod errors;
pub mod organize;
pub mod platform;

pub use cancel::CancelToken;
pub use config::{Config, LogLevel, load_config, load_config_from_xml_path};
pub use errors::OrganizeError;
pub use organize::{
    AuditEntry, AuditSink, ConflictPolicy, FileCatalog, JsonlAuditSink, MemoryAuditSink, MemoryCatalog,
    OperationRecord, OperationRequest, OperationStats, OrganizeEngine, SweepReport, ValidationResult,
    VolumeProbe, sweep_orphaned_partials,
};
pub use platform::VolumeId;
