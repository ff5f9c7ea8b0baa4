//! Search statistics.

use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::difficulty::format_rate;

/// Counters published by the search loop at every reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Total digests computed since start or the last operator reset.
    pub total_iterations: u64,
    /// Digests per second over the last reporting window.
    pub rate: f64,
    /// Best leading-zero score seen. Never decreases between resets.
    pub best_score: u32,
    /// Counter value the next iteration will hash.
    pub counter: u32,
    /// Number of solution events.
    pub solutions: u32,
}

impl SearchStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the best score if `score` beats it. Returns true on a new record.
    pub fn record_score(&mut self, score: u32) -> bool {
        if score > self.best_score {
            self.best_score = score;
            true
        } else {
            false
        }
    }

    /// Format the rate for display.
    pub fn format_rate(&self) -> String {
        format_rate(self.rate)
    }
}

/// Iteration count and start time of the current reporting window.
#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    started_us: u64,
    iterations: u64,
}

impl RateWindow {
    pub fn new(now_us: u64) -> Self {
        RateWindow {
            started_us: now_us,
            iterations: 0,
        }
    }

    #[inline]
    pub fn tick(&mut self) {
        self.iterations += 1;
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// If at least `interval_us` has passed, close the window and return the
    /// rate in iterations per second; a new window starts at `now_us`.
    pub fn close_if_due(&mut self, now_us: u64, interval_us: u64) -> Option<f64> {
        let elapsed_us = now_us.saturating_sub(self.started_us);
        if elapsed_us < interval_us {
            return None;
        }
        let elapsed_s = if elapsed_us == 0 {
            1.0
        } else {
            elapsed_us as f64 / 1_000_000.0
        };
        let rate = self.iterations as f64 / elapsed_s;
        *self = RateWindow::new(now_us);
        Some(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_score_monotonic() {
        let mut stats = SearchStats::new();
        let mut best_seen = 0;
        for score in [3, 1, 7, 7, 2, 12, 0] {
            stats.record_score(score);
            assert!(stats.best_score >= best_seen);
            best_seen = stats.best_score;
        }
        assert_eq!(stats.best_score, 12);
    }

    #[test]
    fn test_record_score_reports_new_records_only() {
        let mut stats = SearchStats::new();
        assert!(stats.record_score(5));
        assert!(!stats.record_score(5));
        assert!(!stats.record_score(4));
        assert!(stats.record_score(6));
    }

    #[test]
    fn test_rate_window() {
        let mut window = RateWindow::new(1_000_000);
        for _ in 0..500 {
            window.tick();
        }
        assert_eq!(window.close_if_due(2_999_999, 2_000_000), None);

        let rate = window.close_if_due(3_000_000, 2_000_000).unwrap();
        assert_eq!(rate, 250.0);
        assert_eq!(window.iterations(), 0);
        assert_eq!(window.close_if_due(4_000_000, 2_000_000), None);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = SearchStats {
            total_iterations: 10,
            rate: 5.0,
            best_score: 9,
            counter: 10,
            solutions: 0,
        };
        let json = serde_json::to_string(&stats).unwrap();
        let back: SearchStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
