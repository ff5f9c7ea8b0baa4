//! Error types for the sweep, the search loop and configuration.

use alloc::string::String;
use core::fmt;

use crate::stats::SearchStats;

/// Why a pin pair was skipped.
#[derive(Debug, thiserror::Error)]
pub enum ScanError<E: fmt::Debug> {
    /// The bus could not be configured on the pair (pin busy, invalid pin).
    #[error("init error: {0:?}")]
    Init(E),
}

/// Fatal failure of the search loop.
///
/// A hash that cannot be computed leaves the iteration and rate accounting
/// unreliable, so the loop stops and hands back what it last knew to be good.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("hash primitive failed after {iterations} iterations: {detail}")]
    Hash {
        /// Iterations completed before the failure.
        iterations: u64,
        /// Statistics from the last completed reporting window.
        last_reported: SearchStats,
        detail: String,
    },
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("candidate pin set is empty")]
    NoCandidates,
    #[error("address range 0x{first:02X}..=0x{last:02X} is not within 0x00..=0x7F")]
    AddressRange { first: u8, last: u8 },
    #[error("bus clock must be non-zero")]
    ZeroClock,
    #[error("report interval must be non-zero")]
    ZeroReportInterval,
    #[error("yield interval must be non-zero")]
    ZeroYieldInterval,
    #[error("solution threshold {0} is above the 256-bit maximum")]
    Threshold(u32),
}
