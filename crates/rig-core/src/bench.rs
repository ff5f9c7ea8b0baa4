//! Named timing registry.
//!
//! Holds up to [`MAX_BENCHMARKS`] entries, each accumulating iteration
//! count, total, min and max elapsed microseconds. Samples for a new name
//! arriving when the registry is full are dropped with a warning.

use log::{info, warn};

use crate::clock::Clock;

const TARGET: &str = "bench";

/// Registry capacity.
pub const MAX_BENCHMARKS: usize = 16;

#[derive(Debug, Clone, Copy)]
struct Entry {
    name: &'static str,
    iterations: u64,
    total_us: u64,
    min_us: u64,
    max_us: u64,
}

impl Entry {
    fn new(name: &'static str) -> Self {
        Entry {
            name,
            iterations: 0,
            total_us: 0,
            min_us: u64::MAX,
            max_us: 0,
        }
    }

    fn clear(&mut self) {
        *self = Entry::new(self.name);
    }
}

/// Aggregated timings for one benchmark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchStats {
    pub name: &'static str,
    pub iterations: u64,
    pub total_us: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub avg_us: f64,
}

impl BenchStats {
    /// Operations per second implied by the average, if any samples exist.
    pub fn ops_per_sec(&self) -> Option<f64> {
        (self.avg_us > 0.0).then(|| 1_000_000.0 / self.avg_us)
    }
}

#[derive(Debug, Clone)]
pub struct Benchmarks {
    entries: [Option<Entry>; MAX_BENCHMARKS],
}

impl Default for Benchmarks {
    fn default() -> Self {
        Self::new()
    }
}

impl Benchmarks {
    pub fn new() -> Self {
        info!(target: TARGET, "Benchmark system initialized");
        Benchmarks {
            entries: [None; MAX_BENCHMARKS],
        }
    }

    /// Timestamp to hand back to [`end`](Self::end).
    pub fn start<C: Clock>(&self, clock: &C) -> u64 {
        clock.now_micros()
    }

    /// Record the time elapsed since `start` under `name`.
    pub fn end<C: Clock>(&mut self, clock: &C, name: &'static str, start: u64) {
        let elapsed = clock.now_micros().saturating_sub(start);
        self.record(name, elapsed);
    }

    /// Record one sample of `elapsed_us` under `name`.
    pub fn record(&mut self, name: &'static str, elapsed_us: u64) {
        let Some(entry) = self.find_or_create(name) else {
            warn!(target: TARGET, "Maximum number of benchmarks reached");
            return;
        };
        entry.iterations += 1;
        entry.total_us += elapsed_us;
        entry.min_us = entry.min_us.min(elapsed_us);
        entry.max_us = entry.max_us.max(elapsed_us);
    }

    pub fn stats(&self, name: &str) -> Option<BenchStats> {
        self.entries
            .iter()
            .flatten()
            .find(|e| e.name == name)
            .map(Self::summarize)
    }

    /// Every benchmark with at least one sample, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = BenchStats> + '_ {
        self.entries
            .iter()
            .flatten()
            .filter(|e| e.iterations > 0)
            .map(Self::summarize)
    }

    /// Log a results table.
    pub fn report(&self) {
        info!(target: TARGET, "=== Performance Benchmark Results ===");
        info!(
            target: TARGET,
            "{:<20} {:>10} {:>12} {:>12} {:>12} {:>12}",
            "Name", "Iterations", "Total(us)", "Min(us)", "Max(us)", "Avg(us)"
        );
        for stats in self.iter() {
            info!(
                target: TARGET,
                "{:<20} {:>10} {:>12} {:>12} {:>12} {:>12.2}",
                stats.name, stats.iterations, stats.total_us, stats.min_us, stats.max_us, stats.avg_us
            );
            if let Some(ops) = stats.ops_per_sec() {
                info!(
                    target: TARGET,
                    "  -> {:.2} ops/sec ({:.2} ms per op)",
                    ops,
                    stats.avg_us / 1000.0
                );
            }
        }
    }

    /// Zero every counter. Registered names are kept.
    pub fn reset_all(&mut self) {
        for entry in self.entries.iter_mut().flatten() {
            entry.clear();
        }
        info!(target: TARGET, "All benchmarks reset");
    }

    fn find_or_create(&mut self, name: &'static str) -> Option<&mut Entry> {
        let index = match self.entries.iter().position(|e| matches!(e, Some(e) if e.name == name)) {
            Some(index) => index,
            None => {
                let free = self.entries.iter().position(Option::is_none)?;
                self.entries[free] = Some(Entry::new(name));
                free
            }
        };
        self.entries[index].as_mut()
    }

    fn summarize(entry: &Entry) -> BenchStats {
        let avg_us = if entry.iterations > 0 {
            entry.total_us as f64 / entry.iterations as f64
        } else {
            0.0
        };
        BenchStats {
            name: entry.name,
            iterations: entry.iterations,
            total_us: entry.total_us,
            min_us: entry.min_us,
            max_us: entry.max_us,
            avg_us,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_record_min_max_avg() {
        let mut bench = Benchmarks::new();
        bench.record("hash", 10);
        bench.record("hash", 30);
        bench.record("hash", 20);

        let stats = bench.stats("hash").unwrap();
        assert_eq!(stats.iterations, 3);
        assert_eq!(stats.total_us, 60);
        assert_eq!(stats.min_us, 10);
        assert_eq!(stats.max_us, 30);
        assert_eq!(stats.avg_us, 20.0);
        assert_eq!(stats.ops_per_sec(), Some(50_000.0));
    }

    #[test]
    fn test_start_end_with_clock() {
        let clock = ManualClock::new(0);
        let mut bench = Benchmarks::new();

        let start = bench.start(&clock);
        clock.advance(250);
        bench.end(&clock, "sweep", start);

        assert_eq!(bench.stats("sweep").unwrap().total_us, 250);
        assert!(bench.stats("missing").is_none());
    }

    #[test]
    fn test_full_registry_drops_new_names() {
        const NAMES: [&str; 17] = [
            "b0", "b1", "b2", "b3", "b4", "b5", "b6", "b7", "b8", "b9", "b10", "b11", "b12",
            "b13", "b14", "b15", "b16",
        ];
        let mut bench = Benchmarks::new();
        for name in NAMES {
            bench.record(name, 1);
        }
        assert_eq!(bench.iter().count(), MAX_BENCHMARKS);
        assert!(bench.stats("b16").is_none());

        // Existing names still record when full
        bench.record("b0", 3);
        assert_eq!(bench.stats("b0").unwrap().iterations, 2);
    }

    #[test]
    fn test_reset_keeps_names() {
        let mut bench = Benchmarks::new();
        bench.record("hash", 5);
        bench.reset_all();

        let stats = bench.stats("hash").unwrap();
        assert_eq!(stats.iterations, 0);
        assert_eq!(stats.avg_us, 0.0);
        assert_eq!(bench.iter().count(), 0);
        assert_eq!(stats.ops_per_sec(), None);
    }
}
