//! Callbacks through which the sweep and the search loop report to the
//! surrounding application (display, telemetry, collectors).
//!
//! Every method has an empty default so a sink only implements what it
//! renders. `()` is the sink that ignores everything.

use core::fmt;

use crate::pins::PinPair;
use crate::scanner::{ScanResult, SweepSummary};
use crate::stats::SearchStats;

/// Receives pin sweep events.
pub trait ScanSink {
    /// A pair on which at least one address acknowledged.
    fn on_scan_found(&mut self, _result: &ScanResult) {}

    /// A pair whose bus could not be initialized.
    fn on_scan_skip(&mut self, _pair: PinPair, _reason: &dyn fmt::Display) {}

    /// All pairs have been attempted.
    fn on_sweep_complete(&mut self, _summary: &SweepSummary) {}
}

/// Receives search loop events.
pub trait SearchSink {
    /// Published once per reporting window.
    fn on_stats_update(&mut self, _stats: &SearchStats) {}

    /// A digest beat the best score so far.
    fn on_new_best(&mut self, _score: u32, _counter: u32, _digest: &[u8; 32]) {}

    /// A digest reached the solution threshold.
    fn on_solution_found(&mut self, _score: u32, _counter: u32, _digest: &[u8; 32]) {}
}

impl ScanSink for () {}

impl SearchSink for () {}

impl<S: ScanSink + ?Sized> ScanSink for &mut S {
    fn on_scan_found(&mut self, result: &ScanResult) {
        (**self).on_scan_found(result)
    }

    fn on_scan_skip(&mut self, pair: PinPair, reason: &dyn fmt::Display) {
        (**self).on_scan_skip(pair, reason)
    }

    fn on_sweep_complete(&mut self, summary: &SweepSummary) {
        (**self).on_sweep_complete(summary)
    }
}

impl<S: SearchSink + ?Sized> SearchSink for &mut S {
    fn on_stats_update(&mut self, stats: &SearchStats) {
        (**self).on_stats_update(stats)
    }

    fn on_new_best(&mut self, score: u32, counter: u32, digest: &[u8; 32]) {
        (**self).on_new_best(score, counter, digest)
    }

    fn on_solution_found(&mut self, score: u32, counter: u32, digest: &[u8; 32]) {
        (**self).on_solution_found(score, counter, digest)
    }
}

/// Fan events out to two sinks, left first.
impl<A: SearchSink, B: SearchSink> SearchSink for (A, B) {
    fn on_stats_update(&mut self, stats: &SearchStats) {
        self.0.on_stats_update(stats);
        self.1.on_stats_update(stats);
    }

    fn on_new_best(&mut self, score: u32, counter: u32, digest: &[u8; 32]) {
        self.0.on_new_best(score, counter, digest);
        self.1.on_new_best(score, counter, digest);
    }

    fn on_solution_found(&mut self, score: u32, counter: u32, digest: &[u8; 32]) {
        self.0.on_solution_found(score, counter, digest);
        self.1.on_solution_found(score, counter, digest);
    }
}

impl<A: ScanSink, B: ScanSink> ScanSink for (A, B) {
    fn on_scan_found(&mut self, result: &ScanResult) {
        self.0.on_scan_found(result);
        self.1.on_scan_found(result);
    }

    fn on_scan_skip(&mut self, pair: PinPair, reason: &dyn fmt::Display) {
        self.0.on_scan_skip(pair, reason);
        self.1.on_scan_skip(pair, reason);
    }

    fn on_sweep_complete(&mut self, summary: &SweepSummary) {
        self.0.on_sweep_complete(summary);
        self.1.on_sweep_complete(summary);
    }
}
