//! Running operation statistics.
//! One mutex guards all counters; every method holds it only for a few
//! arithmetic steps. Nothing is persisted; the audit log is the durable record.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::types::OperationStats;

/// Number of recent durations kept for the rolling average.
pub const STATS_WINDOW_DEFAULT: usize = 100;

#[derive(Debug, Default)]
struct Counters {
    active: usize,
    completed: u64,
    failed: u64,
    total_bytes: u64,
    available_space: u64,
    durations: VecDeque<Duration>,
}

#[derive(Debug)]
pub struct StatsAggregator {
    window: usize,
    inner: Mutex<Counters>,
}

impl StatsAggregator {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            inner: Mutex::new(Counters {
                durations: VecDeque::with_capacity(window),
                ..Counters::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// An attempt began; it stays active until the matching `update`.
    pub fn record_started(&self) {
        self.lock().active += 1;
    }

    /// Fold in a finished attempt.
    pub fn update(&self, success: bool, duration: Duration, bytes: u64) {
        let mut c = self.lock();
        c.active = c.active.saturating_sub(1);
        if success {
            c.completed += 1;
            c.total_bytes = c.total_bytes.saturating_add(bytes);
        } else {
            c.failed += 1;
        }
        if c.durations.len() == self.window {
            c.durations.pop_front();
        }
        c.durations.push_back(duration);
    }

    /// Remember the most recent free-space reading of the target volume.
    pub fn observe_available_space(&self, bytes: u64) {
        self.lock().available_space = bytes;
    }

    pub fn snapshot(&self) -> OperationStats {
        let c = self.lock();
        let finished = c.completed + c.failed;
        let success_rate_percent = if finished > 0 {
            c.completed as f64 / finished as f64 * 100.0
        } else {
            0.0
        };
        let average_duration = if c.durations.is_empty() {
            Duration::ZERO
        } else {
            c.durations.iter().sum::<Duration>() / c.durations.len() as u32
        };
        OperationStats {
            active_count: c.active,
            completed_count: c.completed,
            failed_count: c.failed,
            success_rate_percent,
            average_duration,
            total_bytes_moved: c.total_bytes,
            available_space_bytes: c.available_space,
        }
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new(STATS_WINDOW_DEFAULT)
    }
}
