//! I2C pin/address sweep.
//!
//! For every usable (SDA, SCL) pair drawn from the candidate pins the sweep
//! installs a bus, samples both idle levels, sends an address-only write to
//! every address in the configured range and records which ones were
//! acknowledged. The bus is released before the next pair is tried.
//!
//! A pair whose bus cannot be installed is skipped; a pair where nothing
//! answers simply produces an empty result. Neither stops the sweep.

use alloc::vec::Vec;
use core::fmt;
use core::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{debug, info, trace, warn};

use crate::address::AddressSet;
use crate::config::SweepConfig;
use crate::error::ScanError;
use crate::pins::{candidate_pairs, PairIter, PinId, PinLevel, PinPair};
use crate::sink::ScanSink;
use crate::transport::{BusLease, BusTransport, ProbeOutcome};

const TARGET: &str = "i2c_sweep";

/// What one pair scan observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub pair: PinPair,
    /// SDA level sampled after bus install, before any probe.
    pub idle_data: PinLevel,
    /// SCL level sampled after bus install, before any probe.
    pub idle_clock: PinLevel,
    /// Addresses that acknowledged.
    pub addresses: AddressSet,
    /// Probes issued on this pair.
    pub probes: u32,
    /// Probes that failed with something other than a NACK.
    pub probe_errors: u32,
}

impl ScanResult {
    pub fn found_any(&self) -> bool {
        !self.addresses.is_empty()
    }

    /// A line pulled low while idle usually means nothing is connected, or
    /// something is holding the bus.
    pub fn lines_idle_high(&self) -> bool {
        self.idle_data == PinLevel::High && self.idle_clock == PinLevel::High
    }
}

/// Outcome of one pair attempt.
#[derive(Debug)]
pub enum PairOutcome<E: fmt::Debug> {
    /// The bus came up and every address was probed.
    Scanned(ScanResult),
    /// The bus could not be installed on this pair.
    Skipped { pair: PinPair, error: ScanError<E> },
}

impl<E: fmt::Debug> PairOutcome<E> {
    pub fn pair(&self) -> PinPair {
        match self {
            PairOutcome::Scanned(result) => result.pair,
            PairOutcome::Skipped { pair, .. } => *pair,
        }
    }

    /// The scan result, if the pair was scanned and something answered.
    pub fn found(&self) -> Option<&ScanResult> {
        match self {
            PairOutcome::Scanned(result) if result.found_any() => Some(result),
            _ => None,
        }
    }
}

/// Totals for a finished sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Pairs attempted, skipped ones included.
    pub attempted: usize,
    /// Pairs whose bus failed to initialize.
    pub skipped: usize,
    /// Total probes issued.
    pub probes: u64,
    /// Pairs with at least one acknowledging address, in sweep order.
    pub found: Vec<ScanResult>,
}

impl SweepSummary {
    fn record<E: fmt::Debug>(&mut self, outcome: &PairOutcome<E>) {
        self.attempted += 1;
        match outcome {
            PairOutcome::Scanned(result) => {
                self.probes += u64::from(result.probes);
                if result.found_any() {
                    self.found.push(result.clone());
                }
            }
            PairOutcome::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Lazy sweep over every candidate pair.
///
/// Each call to `next` scans one pair to completion, bus released, settle
/// delay taken. Build a new sweep with [`scan_all_pairs`] to start over.
pub struct PinSweep<'a, T: BusTransport, D: DelayNs> {
    transport: &'a mut T,
    delay: &'a mut D,
    config: &'a SweepConfig,
    pairs: PairIter<'a>,
}

/// Start a sweep over `config.candidates × config.candidates`.
pub fn scan_all_pairs<'a, T: BusTransport, D: DelayNs>(
    transport: &'a mut T,
    delay: &'a mut D,
    config: &'a SweepConfig,
) -> PinSweep<'a, T, D> {
    PinSweep {
        transport,
        delay,
        config,
        pairs: candidate_pairs(&config.candidates, &config.excluded),
    }
}

impl<T: BusTransport, D: DelayNs> Iterator for PinSweep<'_, T, D> {
    type Item = PairOutcome<T::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let pair = self.pairs.next()?;
        let addresses = self.config.first_address..=self.config.last_address;
        let outcome = scan_pair(self.transport, self.delay, self.config, pair, addresses, 0);
        if let PairOutcome::Scanned(_) = outcome {
            self.delay.delay_ms(self.config.settle_ms);
        }
        Some(outcome)
    }
}

/// Run a full sweep, reporting to `sink`, and return the totals.
pub fn run_sweep<T, D, S>(
    transport: &mut T,
    delay: &mut D,
    config: &SweepConfig,
    sink: &mut S,
) -> SweepSummary
where
    T: BusTransport,
    D: DelayNs,
    S: ScanSink + ?Sized,
{
    info!(target: TARGET, "=== starting sweep @{}kHz ===", config.clock_hz / 1000);
    let mut summary = SweepSummary::default();

    for outcome in scan_all_pairs(transport, delay, config) {
        summary.record(&outcome);
        match &outcome {
            PairOutcome::Scanned(result) if result.found_any() => sink.on_scan_found(result),
            PairOutcome::Scanned(_) => {}
            PairOutcome::Skipped { pair, error } => sink.on_scan_skip(*pair, error),
        }
    }

    info!(
        target: TARGET,
        "=== sweep done === ({} pairs, {} skipped, {} with devices)",
        summary.attempted,
        summary.skipped,
        summary.found.len()
    );
    sink.on_sweep_complete(&summary);
    summary
}

/// Probe a short list of addresses on each pair of `sda × scl`.
///
/// Used to confirm a suspected wiring without a full sweep: after the bus
/// is installed the lines get `config.power_up_ms` to settle, then only
/// `addresses` are probed. Pairs follow the same exclusion rules as the
/// sweep.
pub fn probe_pairs<T, D>(
    transport: &mut T,
    delay: &mut D,
    sda: &[PinId],
    scl: &[PinId],
    addresses: &[u8],
    config: &SweepConfig,
) -> Vec<PairOutcome<T::Error>>
where
    T: BusTransport,
    D: DelayNs,
{
    let mut outcomes = Vec::new();
    for pair in PairIter::new(sda, scl, &config.excluded) {
        info!(target: TARGET, "testing {} ...", pair);
        let outcome = scan_pair(
            transport,
            delay,
            config,
            pair,
            addresses.iter().copied(),
            config.power_up_ms,
        );
        match &outcome {
            PairOutcome::Scanned(result) if result.found_any() => {
                warn!(target: TARGET, ">> FOUND ACK! {} ({})", pair, result.addresses);
            }
            PairOutcome::Scanned(_) => info!(target: TARGET, "{} -> nothing found", pair),
            PairOutcome::Skipped { .. } => {}
        }
        delay.delay_ms(config.settle_ms);
        outcomes.push(outcome);
    }
    outcomes
}

fn scan_pair<T, D>(
    transport: &mut T,
    delay: &mut D,
    config: &SweepConfig,
    pair: PinPair,
    addresses: impl Iterator<Item = u8>,
    power_up_ms: u32,
) -> PairOutcome<T::Error>
where
    T: BusTransport,
    D: DelayNs,
{
    let mut lease = match BusLease::acquire(transport, pair, config.clock_hz) {
        Ok(lease) => lease,
        Err(e) => {
            let error = ScanError::Init(e);
            warn!(target: TARGET, "skip {} ({})", pair, error);
            return PairOutcome::Skipped { pair, error };
        }
    };

    let (idle_data, idle_clock) = lease.idle_levels();
    info!(
        target: TARGET,
        "try {} (idle {}/{})",
        pair,
        idle_data.as_bit(),
        idle_clock.as_bit()
    );

    if power_up_ms > 0 {
        delay.delay_ms(power_up_ms);
    }

    let timeout: Duration = config.probe_timeout();
    let mut result = ScanResult {
        pair,
        idle_data,
        idle_clock,
        addresses: AddressSet::new(),
        probes: 0,
        probe_errors: 0,
    };

    for address in addresses {
        result.probes += 1;
        match lease.probe(address, timeout) {
            Ok(ProbeOutcome::Ack) => {
                warn!(target: TARGET, "addr 0x{:02X}", address);
                result.addresses.insert(address);
            }
            Ok(ProbeOutcome::Nack) => {}
            Err(e) => {
                result.probe_errors += 1;
                trace!(target: TARGET, "0x{:02X} -> {:?}", address, e);
            }
        }
    }
    lease.release();

    if result.found_any() {
        warn!(
            target: TARGET,
            "FOUND: {} | {} device(s)",
            pair,
            result.addresses.len()
        );
    } else {
        debug!(target: TARGET, "{}: no devices", pair);
    }
    PairOutcome::Scanned(result)
}
