//! Cooperative cancellation.
//! A cloneable flag shared between the caller (or a signal handler) and
//! running operations. Operations poll it at the semaphore wait and at every
//! copy chunk boundary.
//!
//! Notes:
//! - Relaxed atomics are sufficient for a one-way "stop" flag.
//! - `cancel()` is safe to call from a ctrlc handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::OrganizeError;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation (idempotent).
    #[inline]
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<(), OrganizeError> {
        if self.is_cancelled() {
            Err(OrganizeError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(a.check().is_ok());
        b.cancel();
        assert!(a.is_cancelled());
        assert!(matches!(a.check(), Err(OrganizeError::Cancelled)));
    }
}
