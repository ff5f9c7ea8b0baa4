//! Rig configuration and reference constants.

use alloc::vec::Vec;
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::address::{FIRST_PROBE_ADDRESS, LAST_PROBE_ADDRESS};
use crate::error::ConfigError;
use crate::pins::{PinId, S3_CANDIDATES, S3_EXCLUDED};

/// Bus clock used during the sweep. Low enough to keep false ACKs from
/// line noise down.
pub const SWEEP_CLOCK_HZ: u32 = 100_000;

/// Per-probe transaction timeout.
pub const PROBE_TIMEOUT_MS: u64 = 50;

/// Pause between pin pairs so the lines can settle.
pub const SETTLE_DELAY_MS: u32 = 10;

/// Wait after installing a bus before the first targeted probe.
pub const POWER_UP_DELAY_MS: u32 = 3;

/// Work buffer version field with BIP9 versionbits.
pub const WORK_VERSION: u32 = 0x2000_0000;

/// Placeholder difficulty bits. Written to the buffer, never compared.
pub const PLACEHOLDER_BITS: u32 = 0x1d00_ffff;

/// Leading zero bits that count as a solution.
pub const SOLUTION_THRESHOLD: u32 = 70;

/// Pause after a solution so an operator can see it.
pub const SOLUTION_COOLDOWN_MS: u64 = 10_000;

/// Interval between throughput reports.
pub const REPORT_INTERVAL_MS: u64 = 2_000;

/// Iterations between voluntary yields.
pub const YIELD_EVERY: u32 = 1_000;

/// Settings for the pin/address sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Pins to pair up, in sweep order.
    pub candidates: Vec<PinId>,
    /// Pins that must never be driven.
    pub excluded: Vec<PinId>,
    pub clock_hz: u32,
    pub probe_timeout_ms: u64,
    pub settle_ms: u32,
    /// Delay between bus install and the first targeted probe.
    pub power_up_ms: u32,
    pub first_address: u8,
    pub last_address: u8,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            candidates: S3_CANDIDATES.to_vec(),
            excluded: S3_EXCLUDED.to_vec(),
            clock_hz: SWEEP_CLOCK_HZ,
            probe_timeout_ms: PROBE_TIMEOUT_MS,
            settle_ms: SETTLE_DELAY_MS,
            power_up_ms: POWER_UP_DELAY_MS,
            first_address: FIRST_PROBE_ADDRESS,
            last_address: LAST_PROBE_ADDRESS,
        }
    }
}

impl SweepConfig {
    /// Sweep over `candidates` with no excluded pins.
    pub fn with_candidates(candidates: &[PinId]) -> Self {
        SweepConfig {
            candidates: candidates.to_vec(),
            excluded: Vec::new(),
            ..Self::default()
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Number of addresses probed per pair.
    pub fn addresses_per_pair(&self) -> usize {
        (self.first_address..=self.last_address).count()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.candidates.is_empty() {
            return Err(ConfigError::NoCandidates);
        }
        if self.first_address > self.last_address || self.last_address > 0x7F {
            return Err(ConfigError::AddressRange {
                first: self.first_address,
                last: self.last_address,
            });
        }
        if self.clock_hz == 0 {
            return Err(ConfigError::ZeroClock);
        }
        Ok(())
    }
}

/// Settings for the hash-search loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub version: u32,
    pub bits: u32,
    pub solution_threshold: u32,
    /// Cooldown after a solution; zero disables it.
    pub cooldown_ms: u64,
    pub report_interval_ms: u64,
    pub yield_every: u32,
    /// Time every double hash through the benchmark registry.
    pub benchmark: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            version: WORK_VERSION,
            bits: PLACEHOLDER_BITS,
            solution_threshold: SOLUTION_THRESHOLD,
            cooldown_ms: SOLUTION_COOLDOWN_MS,
            report_interval_ms: REPORT_INTERVAL_MS,
            yield_every: YIELD_EVERY,
            benchmark: false,
        }
    }
}

impl SearchConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn report_interval_us(&self) -> u64 {
        self.report_interval_ms.saturating_mul(1_000)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.report_interval_ms == 0 {
            return Err(ConfigError::ZeroReportInterval);
        }
        if self.yield_every == 0 {
            return Err(ConfigError::ZeroYieldInterval);
        }
        if self.solution_threshold > 256 {
            return Err(ConfigError::Threshold(self.solution_threshold));
        }
        Ok(())
    }
}
