//! The leading-zero hash search loop.
//!
//! Each iteration double-hashes the work buffer, scores the digest by its
//! leading zero bits, updates the best score and advances the counter.
//! Every reporting interval the loop computes its throughput and publishes
//! a statistics snapshot to the sink.

use alloc::format;
use core::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::bench::Benchmarks;
use crate::clock::{Clock, Pacer};
use crate::config::SearchConfig;
use crate::difficulty::{expected_iterations, format_count, is_solution};
use crate::error::{ConfigError, SearchError};
use crate::hash::{double_digest, hash_to_display_hex, leading_zero_bits, short_display, Hasher256};
use crate::sink::SearchSink;
use crate::stats::{RateWindow, SearchStats};
use crate::work::WorkBuffer;

const TARGET: &str = "miner";

/// Benchmark name for one double hash.
pub const HASH_BENCHMARK: &str = "double_sha256";

/// Where the loop is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Running,
    /// Paused after a solution; returns to `Running` once the cooldown ends.
    SolutionCooldown,
}

/// Cross-thread controls for a running loop.
#[derive(Debug, Default)]
pub struct SearchControl {
    cancel: AtomicBool,
    reset: AtomicBool,
}

impl SearchControl {
    pub const fn new() -> Self {
        SearchControl {
            cancel: AtomicBool::new(false),
            reset: AtomicBool::new(false),
        }
    }

    /// Ask the loop to stop after the current iteration.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Ask the loop to zero its totals and best score (operator action).
    pub fn request_reset(&self) {
        self.reset.store(true, Ordering::Release);
    }

    fn take_reset(&self) -> bool {
        self.reset.swap(false, Ordering::AcqRel)
    }
}

/// What a single iteration produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationOutcome {
    /// Counter value that was hashed.
    pub counter: u32,
    pub score: u32,
    pub new_best: bool,
    pub solution: bool,
    /// A statistics snapshot was published at the end of this iteration.
    pub reported: bool,
}

/// The search loop and the state it owns.
pub struct HashSearch<H, C, P> {
    hasher: H,
    clock: C,
    pacer: P,
    config: SearchConfig,
    work: WorkBuffer,
    stats: SearchStats,
    last_reported: SearchStats,
    window: RateWindow,
    state: SearchState,
    bench: Option<Benchmarks>,
    since_yield: u32,
}

impl<H: Hasher256, C: Clock, P: Pacer> HashSearch<H, C, P> {
    /// Prepare the work buffer and zeroed statistics.
    ///
    /// Fails if `config` does not validate.
    pub fn new(hasher: H, clock: C, pacer: P, config: SearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let work = WorkBuffer::new(config.version, clock.unix_seconds(), config.bits);
        let window = RateWindow::new(clock.now_micros());
        let bench = config.benchmark.then(Benchmarks::new);
        info!(target: TARGET, "Work buffer initialized (timestamp {})", work.timestamp());

        Ok(HashSearch {
            hasher,
            clock,
            pacer,
            config,
            work,
            stats: SearchStats::new(),
            last_reported: SearchStats::new(),
            window,
            state: SearchState::Running,
            bench,
            since_yield: 0,
        })
    }

    /// Run one iteration.
    pub fn step<S: SearchSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<IterationOutcome, SearchError> {
        let counter = self.work.counter();
        let digest = self.digest()?;

        self.stats.total_iterations += 1;
        self.window.tick();

        let score = leading_zero_bits(&digest);
        let new_best = self.stats.record_score(score);
        if new_best {
            info!(
                target: TARGET,
                "New best difficulty: {} leading zeros (1 in {})",
                score,
                format_count(expected_iterations(score))
            );
            info!(target: TARGET, "Hash: {}", short_display(&digest));
            sink.on_new_best(score, counter, &digest);
        }

        let solution = is_solution(score, self.config.solution_threshold);
        if solution {
            self.stats.solutions += 1;
            warn!(target: TARGET, "!!! BLOCK FOUND !!! score {} at counter {}", score, counter);
            warn!(target: TARGET, "Hash: {}", hash_to_display_hex(&digest));
            sink.on_solution_found(score, counter, &digest);
            self.cooldown();
        }

        let next = self.work.advance();
        self.stats.counter = next;

        let reported = self.report_if_due(sink);

        self.since_yield += 1;
        if self.since_yield >= self.config.yield_every {
            self.since_yield = 0;
            self.pacer.yield_now();
        }

        Ok(IterationOutcome {
            counter,
            score,
            new_best,
            solution,
            reported,
        })
    }

    /// Iterate until `control` is cancelled.
    ///
    /// Returns the final statistics on cancellation. A hashing failure ends
    /// the loop with [`SearchError::Hash`].
    pub fn run<S: SearchSink + ?Sized>(
        &mut self,
        control: &SearchControl,
        sink: &mut S,
    ) -> Result<SearchStats, SearchError> {
        info!(target: TARGET, "Search loop started");
        while !control.is_cancelled() {
            if control.take_reset() {
                self.reset_stats();
            }
            self.step(sink)?;
        }
        info!(
            target: TARGET,
            "Search loop cancelled after {} iterations",
            self.stats.total_iterations
        );
        Ok(self.stats)
    }

    /// Run exactly `iterations` iterations.
    pub fn run_for<S: SearchSink + ?Sized>(
        &mut self,
        iterations: u64,
        sink: &mut S,
    ) -> Result<SearchStats, SearchError> {
        for _ in 0..iterations {
            self.step(sink)?;
        }
        Ok(self.stats)
    }

    /// Zero totals, best score and the rate window. The counter and the
    /// solution count carry over.
    pub fn reset_stats(&mut self) {
        self.stats = SearchStats {
            counter: self.stats.counter,
            solutions: self.stats.solutions,
            ..SearchStats::new()
        };
        self.window = RateWindow::new(self.clock.now_micros());
        info!(target: TARGET, "Statistics reset by operator");
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// The snapshot most recently published to the sink.
    pub fn last_reported(&self) -> &SearchStats {
        &self.last_reported
    }

    pub fn work(&self) -> &WorkBuffer {
        &self.work
    }

    /// Continue from `counter` instead of zero.
    pub fn set_counter(&mut self, counter: u32) {
        self.work.set_counter(counter);
        self.stats.counter = counter;
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn benchmarks(&self) -> Option<&Benchmarks> {
        self.bench.as_ref()
    }

    fn digest(&mut self) -> Result<[u8; 32], SearchError> {
        let start = self.bench.as_ref().map(|bench| bench.start(&self.clock));
        let digest = double_digest(&mut self.hasher, self.work.as_bytes()).map_err(|e| {
            SearchError::Hash {
                iterations: self.stats.total_iterations,
                last_reported: self.last_reported,
                detail: format!("{:?}", e),
            }
        })?;
        if let (Some(bench), Some(start)) = (self.bench.as_mut(), start) {
            bench.end(&self.clock, HASH_BENCHMARK, start);
        }
        Ok(digest)
    }

    fn cooldown(&mut self) {
        let cooldown = self.config.cooldown();
        if cooldown.is_zero() {
            return;
        }
        self.state = SearchState::SolutionCooldown;
        self.pacer.pause(cooldown);
        self.state = SearchState::Running;
    }

    fn report_if_due<S: SearchSink + ?Sized>(&mut self, sink: &mut S) -> bool {
        let now = self.clock.now_micros();
        let Some(rate) = self
            .window
            .close_if_due(now, self.config.report_interval_us())
        else {
            return false;
        };
        self.stats.rate = rate;
        self.last_reported = self.stats;
        info!(
            target: TARGET,
            "Hashrate: {}, Total: {}, Best: {}",
            self.stats.format_rate(),
            self.stats.total_iterations,
            self.stats.best_score
        );
        sink.on_stats_update(&self.stats);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::hash::{double_sha256, Sha256Hasher};
    use alloc::vec::Vec;
    use core::time::Duration;

    #[derive(Default)]
    struct CountingPacer {
        yields: usize,
        pauses: Vec<Duration>,
    }

    impl Pacer for CountingPacer {
        fn yield_now(&mut self) {
            self.yields += 1;
        }

        fn pause(&mut self, duration: Duration) {
            self.pauses.push(duration);
        }
    }

    #[derive(Default)]
    struct Recorder {
        updates: Vec<SearchStats>,
        bests: Vec<u32>,
        solutions: Vec<(u32, u32)>,
    }

    impl SearchSink for Recorder {
        fn on_stats_update(&mut self, stats: &SearchStats) {
            self.updates.push(*stats);
        }

        fn on_new_best(&mut self, score: u32, _counter: u32, _digest: &[u8; 32]) {
            self.bests.push(score);
        }

        fn on_solution_found(&mut self, score: u32, counter: u32, _digest: &[u8; 32]) {
            self.solutions.push((score, counter));
        }
    }

    /// Hasher that fails on its nth call.
    struct FailingHasher {
        calls: u32,
        fail_at: u32,
    }

    impl Hasher256 for FailingHasher {
        type Error = &'static str;

        fn digest256(&mut self, data: &[u8]) -> Result<[u8; 32], &'static str> {
            self.calls += 1;
            if self.calls == self.fail_at {
                return Err("engine busy");
            }
            Ok(crate::hash::sha256(data))
        }
    }

    fn real_search(
        clock: ManualClock,
        config: SearchConfig,
    ) -> HashSearch<Sha256Hasher, ManualClock, CountingPacer> {
        HashSearch::new(Sha256Hasher, clock, CountingPacer::default(), config).unwrap()
    }

    #[test]
    fn test_initial_work_buffer() {
        let clock = ManualClock::new(0).with_unix_seconds(1_700_000_000);
        let search = real_search(clock, SearchConfig::default());

        assert_eq!(search.work().version(), 0x2000_0000);
        assert_eq!(search.work().timestamp(), 1_700_000_000);
        assert_eq!(search.work().bits(), 0x1d00_ffff);
        assert_eq!(search.work().counter(), 0);
        assert_eq!(search.state(), SearchState::Running);
    }

    #[test]
    fn test_step_scores_real_digest() {
        let clock = ManualClock::new(0).with_unix_seconds(1_700_000_000);
        let mut search = real_search(clock, SearchConfig::default());
        let expected = leading_zero_bits(&double_sha256(search.work().as_bytes()));

        let outcome = search.step(&mut ()).unwrap();

        assert_eq!(outcome.counter, 0);
        assert_eq!(outcome.score, expected);
        assert_eq!(search.work().counter(), 1);
        assert_eq!(search.stats().total_iterations, 1);
        assert_eq!(search.stats().counter, 1);
    }

    #[test]
    fn test_best_score_non_decreasing() {
        let clock = ManualClock::new(0);
        let mut search = real_search(clock, SearchConfig::default());
        let mut sink = Recorder::default();

        let mut best = 0;
        let mut max_score = 0;
        for _ in 0..2_000 {
            let outcome = search.step(&mut sink).unwrap();
            max_score = max_score.max(outcome.score);
            assert!(search.stats().best_score >= best);
            best = search.stats().best_score;
        }
        assert_eq!(best, max_score);
        assert!(sink.bests.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_reports_every_interval() {
        // 1 ms per clock read; each iteration reads the clock once
        let clock = ManualClock::new(0).with_step(1_000);
        let config = SearchConfig {
            report_interval_ms: 100,
            ..SearchConfig::default()
        };
        let mut search = real_search(clock, config);
        let mut sink = Recorder::default();

        search.run_for(1_000, &mut sink).unwrap();

        assert_eq!(sink.updates.len(), 10);
        let first = sink.updates[0];
        assert_eq!(first.total_iterations, 100);
        assert_eq!(first.rate, 1_000.0);
        assert_eq!(first.counter, 100);
        assert_eq!(*search.last_reported(), *sink.updates.last().unwrap());
    }

    #[test]
    fn test_yields_every_thousand() {
        let clock = ManualClock::new(0);
        let mut search = real_search(clock, SearchConfig::default());

        search.run_for(2_500, &mut ()).unwrap();

        assert_eq!(search.pacer.yields, 2);
    }

    #[test]
    fn test_counter_wraps_without_error() {
        let clock = ManualClock::new(0);
        let mut search = real_search(clock, SearchConfig::default());
        search.set_counter(u32::MAX - 1);

        search.run_for(3, &mut ()).unwrap();

        assert_eq!(search.work().counter(), 1);
        assert_eq!(search.stats().total_iterations, 3);
    }

    #[test]
    fn test_solution_threshold_and_cooldown() {
        let clock = ManualClock::new(0);
        let config = SearchConfig {
            solution_threshold: 0,
            cooldown_ms: 10_000,
            ..SearchConfig::default()
        };
        let mut search = real_search(clock, config);
        let mut sink = Recorder::default();

        search.run_for(3, &mut sink).unwrap();

        assert_eq!(sink.solutions.len(), 3);
        assert_eq!(sink.solutions[2].1, 2);
        assert_eq!(search.stats().solutions, 3);
        assert_eq!(search.pacer.pauses, [Duration::from_secs(10); 3]);
        assert_eq!(search.state(), SearchState::Running);
    }

    #[test]
    fn test_zero_cooldown_skips_pause() {
        let clock = ManualClock::new(0);
        let config = SearchConfig {
            solution_threshold: 0,
            cooldown_ms: 0,
            ..SearchConfig::default()
        };
        let mut search = real_search(clock, config);

        search.run_for(2, &mut ()).unwrap();

        assert!(search.pacer.pauses.is_empty());
    }

    #[test]
    fn test_hash_failure_is_fatal() {
        let clock = ManualClock::new(0).with_step(1_000);
        let config = SearchConfig {
            report_interval_ms: 1,
            ..SearchConfig::default()
        };
        // Two digests per iteration; the 7th call is in the 4th iteration
        let hasher = FailingHasher { calls: 0, fail_at: 7 };
        let mut search = HashSearch::new(hasher, clock, CountingPacer::default(), config).unwrap();

        let err = search.run_for(10, &mut ()).unwrap_err();

        let SearchError::Hash {
            iterations,
            last_reported,
            detail,
        } = err;
        assert_eq!(iterations, 3);
        assert_eq!(last_reported.total_iterations, 3);
        assert!(detail.contains("engine busy"));
    }

    #[test]
    fn test_control_cancel_and_reset() {
        let clock = ManualClock::new(0);
        let mut search = real_search(clock, SearchConfig::default());
        search.run_for(50, &mut ()).unwrap();

        let control = SearchControl::new();
        control.request_reset();
        control.cancel();
        // Cancelled before the first iteration: nothing runs, reset pending
        let stats = search.run(&control, &mut ()).unwrap();
        assert_eq!(stats.total_iterations, 50);

        search.reset_stats();
        assert_eq!(search.stats().total_iterations, 0);
        assert_eq!(search.stats().best_score, 0);
        assert_eq!(search.stats().counter, 50);
    }

    /// Sink that cancels the loop after a fixed number of solutions.
    struct CancelAfter<'a> {
        control: &'a SearchControl,
        solutions_left: usize,
        solutions: u32,
    }

    impl SearchSink for CancelAfter<'_> {
        fn on_solution_found(&mut self, _score: u32, _counter: u32, _digest: &[u8; 32]) {
            self.solutions += 1;
            self.solutions_left = self.solutions_left.saturating_sub(1);
            if self.solutions_left == 0 {
                self.control.cancel();
            }
        }
    }

    #[test]
    fn test_pending_reset_applied_by_run() {
        let clock = ManualClock::new(0);
        let config = SearchConfig {
            solution_threshold: 0,
            cooldown_ms: 0,
            ..SearchConfig::default()
        };
        let mut search = real_search(clock, config);
        search.run_for(3, &mut ()).unwrap();
        assert_eq!(search.stats().solutions, 3);

        let control = SearchControl::new();
        control.request_reset();
        let mut sink = CancelAfter {
            control: &control,
            solutions_left: 2,
            solutions: 0,
        };
        let stats = search.run(&control, &mut sink).unwrap();

        // Totals restart from the reset; solutions keep counting up
        assert_eq!(stats.total_iterations, 2);
        assert_eq!(stats.counter, 5);
        assert_eq!(stats.solutions, 5);
        assert_eq!(sink.solutions, 2);

        // The flag is consumed: a second run does not reset again
        let control = SearchControl::new();
        let mut sink = CancelAfter {
            control: &control,
            solutions_left: 1,
            solutions: 0,
        };
        let stats = search.run(&control, &mut sink).unwrap();
        assert_eq!(stats.total_iterations, 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SearchConfig {
            yield_every: 0,
            ..SearchConfig::default()
        };
        let result = HashSearch::new(
            Sha256Hasher,
            ManualClock::new(0),
            CountingPacer::default(),
            config,
        );
        assert_eq!(result.err(), Some(ConfigError::ZeroYieldInterval));

        let config = SearchConfig {
            report_interval_ms: 0,
            ..SearchConfig::default()
        };
        let result = HashSearch::new(
            Sha256Hasher,
            ManualClock::new(0),
            CountingPacer::default(),
            config,
        );
        assert_eq!(result.err(), Some(ConfigError::ZeroReportInterval));
    }

    #[test]
    fn test_yield_cadence_follows_iterations_not_counter() {
        let clock = ManualClock::new(0);
        let config = SearchConfig {
            yield_every: 10,
            ..SearchConfig::default()
        };
        let mut search = real_search(clock, config);
        // A counter multiple of 10 must not trigger an early yield
        search.set_counter(95);

        search.run_for(9, &mut ()).unwrap();
        assert_eq!(search.pacer.yields, 0);

        search.run_for(1, &mut ()).unwrap();
        assert_eq!(search.pacer.yields, 1);
    }

    #[test]
    fn test_benchmark_records_each_hash() {
        let clock = ManualClock::new(0).with_step(5);
        let config = SearchConfig {
            benchmark: true,
            ..SearchConfig::default()
        };
        let mut search = real_search(clock, config);

        search.run_for(20, &mut ()).unwrap();

        let stats = search.benchmarks().unwrap().stats(HASH_BENCHMARK).unwrap();
        assert_eq!(stats.iterations, 20);
        assert_eq!(stats.min_us, 5);
    }
}
