//! Concurrency governor.
//! A counting semaphore (mutex + condvar) bounding simultaneous moves, plus a
//! registry of in-flight operations for introspection.
//!
//! Notes:
//! - Waiters poll the cancel token every `WAIT_POLL`, so a cancelled caller
//!   leaves the queue promptly even if no permit is released.
//! - Permits and registry entries are released by drop guards; an error or a
//!   panic inside the guarded closure never leaks a slot.
//! - No lock is held while the guarded closure runs.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use uuid::Uuid;

use super::types::InFlightOperation;
use crate::cancel::CancelToken;
use crate::errors::OrganizeError;

/// Moves are disk-bound; two keeps a single spindle or SD card busy without thrashing.
pub const MAX_CONCURRENT_DEFAULT: usize = 2;
const WAIT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug)]
struct SemState {
    available: usize,
    closed: bool,
}

#[derive(Debug)]
pub struct ConcurrencyGovernor {
    limit: usize,
    state: Mutex<SemState>,
    freed: Condvar,
    registry: Mutex<HashMap<Uuid, InFlightOperation>>,
}

/// Held while an operation occupies a slot.
#[must_use = "the permit is released when dropped"]
pub struct Permit<'a> {
    governor: &'a ConcurrencyGovernor,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let mut st = lock(&self.governor.state);
        st.available += 1;
        drop(st);
        self.governor.freed.notify_one();
    }
}

struct Registration<'a> {
    governor: &'a ConcurrencyGovernor,
    id: Uuid,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        lock(&self.governor.registry).remove(&self.id);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // Guarded sections only touch counters and the map; their state stays
    // consistent even if a holder panicked.
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConcurrencyGovernor {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            state: Mutex::new(SemState {
                available: limit,
                closed: false,
            }),
            freed: Condvar::new(),
            registry: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Block until a slot is free, the token is cancelled, or the governor shuts down.
    pub fn acquire(&self, cancel: &CancelToken) -> Result<Permit<'_>, OrganizeError> {
        let start = Instant::now();
        let mut st = lock(&self.state);
        loop {
            if st.closed {
                return Err(OrganizeError::ShuttingDown);
            }
            cancel.check()?;
            if st.available > 0 {
                st.available -= 1;
                trace!(waited_ms = start.elapsed().as_millis() as u64, "move slot acquired");
                return Ok(Permit { governor: self });
            }
            st = self
                .freed
                .wait_timeout(st, WAIT_POLL)
                .map(|(g, _)| g)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    /// Run `f` while holding a slot, with `op` visible in the registry.
    pub fn run<T>(
        &self,
        op: InFlightOperation,
        cancel: &CancelToken,
        f: impl FnOnce() -> Result<T, OrganizeError>,
    ) -> Result<T, OrganizeError> {
        let _permit = self.acquire(cancel)?;
        let id = op.operation_id;
        debug!(operation_id = %id, file_id = %op.file_id, "operation in flight");
        lock(&self.registry).insert(id, op);
        let _registration = Registration { governor: self, id };
        f()
    }

    /// Snapshot of the operations currently holding a slot.
    pub fn in_flight(&self) -> Vec<InFlightOperation> {
        let mut ops: Vec<_> = lock(&self.registry).values().cloned().collect();
        ops.sort_by_key(|o| o.started_at);
        ops
    }

    pub fn active_count(&self) -> usize {
        lock(&self.registry).len()
    }

    /// Refuse new work and wake every waiter. Operations already running finish normally.
    pub fn shutdown(&self) {
        lock(&self.state).closed = true;
        self.freed.notify_all();
    }

    pub fn is_shut_down(&self) -> bool {
        lock(&self.state).closed
    }
}

impl Default for ConcurrencyGovernor {
    fn default() -> Self {
        Self::new(MAX_CONCURRENT_DEFAULT)
    }
}
