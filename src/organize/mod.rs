//! Atomic file organization engine.
//!
//! Layout:
//! - validate:    pre-flight checks (space, volumes, paths)
//! - materialize: idempotent directory creation
//! - executor:    rename or copy+verify+delete
//! - governor:    bounded concurrency and in-flight registry
//! - recorder:    audit entries and sinks
//! - stats:       running counters
//! - engine:      wires the above in a fixed order

mod atomic;
pub mod catalog;
pub mod duplicate;
pub mod engine;
pub mod executor;
pub mod governor;
mod helpers;
mod io_copy;
pub mod materialize;
mod metadata;
pub mod recorder;
pub mod stats;
pub mod sweep;
pub mod types;
pub mod validate;
pub mod volume;

pub use catalog::{FileCatalog, MemoryCatalog};
pub use duplicate::unique_destination;
pub use engine::{OrganizeEngine, OrganizeEngineBuilder};
pub use executor::{MoveExecutor, MoveOutcome, MoveStrategy};
pub use governor::{ConcurrencyGovernor, MAX_CONCURRENT_DEFAULT, Permit};
pub use io_copy::COPY_CHUNK_DEFAULT;
pub use materialize::{DirectoryMaterializer, MaterializeOutcome};
pub use recorder::{AuditEntry, AuditLevel, AuditSink, JsonlAuditSink, MemoryAuditSink, OperationRecorder, TracingAuditSink};
pub use stats::{STATS_WINDOW_DEFAULT, StatsAggregator};
pub use sweep::{SweepReport, sweep_orphaned_partials};
pub use types::{
    ConflictPolicy, InFlightOperation, OperationKind, OperationRecord, OperationRequest, OperationStats,
    ValidationResult,
};
pub use validate::{PATH_LENGTH_WARNING_DEFAULT, SAFETY_MARGIN_DEFAULT, ValidationEngine};
pub use volume::{SystemVolumes, VolumeProbe, existing_ancestor};
