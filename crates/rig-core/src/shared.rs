//! Statistics shared between the search thread and a telemetry reader.
//!
//! The search loop is the only writer and publishes once per reporting
//! window under a single lock acquisition, so readers never see a torn
//! snapshot. Readers wait at most a bounded time for the lock and skip the
//! cycle if they cannot get it, so the producer is never held up. The wait
//! sleeps between attempts with a short doubling backoff.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use crate::sink::SearchSink;
use crate::stats::SearchStats;

const MIN_BACKOFF: Duration = Duration::from_micros(50);
const MAX_BACKOFF: Duration = Duration::from_millis(2);

/// Handle to the shared statistics. Clones refer to the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedStats {
    inner: Arc<Mutex<SearchStats>>,
}

impl SharedStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot.
    pub fn publish(&self, stats: &SearchStats) {
        *self.lock() = *stats;
    }

    /// Copy the snapshot, waiting up to `timeout` for the lock.
    ///
    /// Returns `None` if the lock stayed busy for the whole timeout.
    pub fn try_snapshot(&self, timeout: Duration) -> Option<SearchStats> {
        let deadline = Instant::now() + timeout;
        let mut backoff = MIN_BACKOFF;
        loop {
            match self.inner.try_lock() {
                Ok(guard) => return Some(*guard),
                Err(TryLockError::Poisoned(poisoned)) => return Some(*poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    thread::sleep(backoff.min(deadline - now));
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    /// Modify the snapshot in place under one lock acquisition.
    pub fn update<R>(&self, f: impl FnOnce(&mut SearchStats) -> R) -> R {
        f(&mut self.lock())
    }

    /// Copy the snapshot, blocking until the lock is free.
    pub fn snapshot(&self) -> SearchStats {
        *self.lock()
    }

    // A writer that panicked mid-update still leaves a whole `SearchStats`
    // behind (it is `Copy`), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, SearchStats> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SearchSink for SharedStats {
    fn on_stats_update(&mut self, stats: &SearchStats) {
        self.publish(stats);
    }

    fn on_solution_found(&mut self, score: u32, counter: u32, _digest: &[u8; 32]) {
        self.update(|shared| {
            shared.solutions += 1;
            shared.best_score = shared.best_score.max(score);
            shared.counter = counter;
        });
    }
}
