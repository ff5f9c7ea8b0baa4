//! S3 rig runner.
//!
//! Sweeps the (simulated) pin pairs once at boot, then runs the hash search
//! on its own thread while this thread renders telemetry.

mod config;
mod display;
mod telemetry;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use embedded_hal::delay::DelayNs;
use log::{error, info, warn};
use rig_core::address::OLED_ADDRESSES;
use rig_core::clock::{StdClock, ThreadPacer};
use rig_core::{
    probe_pairs, run_sweep, Benchmarks, HashSearch, SearchControl, SearchStats, Sha256Hasher,
    SharedStats, SweepSummary,
};

use crate::config::RigConfig;
use crate::display::open_display;
use crate::telemetry::Telemetry;

const SWEEP_BENCHMARK: &str = "boot_sweep";
const PROBE_BENCHMARK: &str = "targeted_probe";

/// Blocking delay on the current thread.
struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = RigConfig::load()?;
    config.validate().context("invalid configuration")?;

    let clock = StdClock::new();
    let mut bench = Benchmarks::new();
    let summary = boot_sweep(&config, &clock, &mut bench);
    let panel_detected = summary
        .found
        .iter()
        .any(|r| OLED_ADDRESSES.iter().any(|a| r.addresses.contains(*a)));

    let shared = SharedStats::new();
    let control = Arc::new(SearchControl::new());
    let mut telemetry = Telemetry::new(
        open_display(config.telemetry.display, panel_detected),
        shared.clone(),
        &config.telemetry,
    );
    telemetry.start()?;

    let mut search = HashSearch::new(
        Sha256Hasher,
        StdClock::new(),
        ThreadPacer,
        config.search.clone(),
    )
    .context("search configuration")?;
    let miner = {
        let control = Arc::clone(&control);
        let mut sink = shared;
        thread::Builder::new()
            .name("miner".into())
            .spawn(move || {
                let result = search.run(&control, &mut sink);
                if let Err(e) = &result {
                    error!(target: "miner", "{}", e);
                    control.cancel();
                }
                if let Some(bench) = search.benchmarks() {
                    bench.report();
                }
                result
            })
            .context("spawning mining thread")?
    };

    let deadline = config
        .run_seconds
        .map(|s| Instant::now() + Duration::from_secs(s));
    let telemetry_result = telemetry.run(&control, config.telemetry.poll_interval(), deadline);
    control.cancel();

    let stats: SearchStats = miner
        .join()
        .map_err(|_| anyhow!("mining thread panicked"))??;
    telemetry_result?;

    info!(
        "Telemetry skipped {} frame(s) on a busy stats lock",
        telemetry.skipped()
    );
    info!(
        "Finished: {} hashes, best {} zeros, {} solutions, counter {}",
        stats.total_iterations, stats.best_score, stats.solutions, stats.counter
    );
    bench.report();
    Ok(())
}

/// Full sweep plus the optional targeted probe, both timed.
fn boot_sweep(config: &RigConfig, clock: &StdClock, bench: &mut Benchmarks) -> SweepSummary {
    let mut transport = config.sim.build_transport();
    let mut delay = ThreadDelay;

    let start = bench.start(clock);
    let summary = run_sweep(&mut transport, &mut delay, &config.sweep, &mut ());
    bench.end(clock, SWEEP_BENCHMARK, start);

    if summary.found.is_empty() {
        warn!("No device answered on any pin pair");
    }
    for result in &summary.found {
        info!("Device(s) on {}: {}", result.pair, result.addresses);
    }

    if let Some(probe) = &config.probe {
        let start = bench.start(clock);
        let outcomes = probe_pairs(
            &mut transport,
            &mut delay,
            &probe.sda,
            &probe.scl,
            &probe.addresses,
            &config.sweep,
        );
        bench.end(clock, PROBE_BENCHMARK, start);
        let hits = outcomes.iter().filter_map(|o| o.found()).count();
        info!("Targeted probe: {} pair(s) tried, {} answered", outcomes.len(), hits);
    }

    summary
}
