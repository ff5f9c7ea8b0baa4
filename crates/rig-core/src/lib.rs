//! Core logic for the S3 test rig.
//!
//! This crate provides pure Rust implementations of:
//! - An I2C pin/address sweep that discovers which GPIO pair a device sits on
//! - A double SHA256 search loop that tracks the best leading-zero score
//! - Search statistics shared between the loop and a telemetry reader
//! - A small named timing registry for benchmarking hot paths

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod address;
pub mod bench;
pub mod clock;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod hash;
pub mod pins;
pub mod scanner;
pub mod search;
#[cfg(feature = "std")]
pub mod shared;
pub mod sink;
pub mod stats;
pub mod transport;
pub mod work;

pub use address::AddressSet;
pub use bench::{BenchStats, Benchmarks};
pub use clock::{Clock, Pacer};
pub use config::{SearchConfig, SweepConfig};
pub use error::{ConfigError, ScanError, SearchError};
pub use hash::{leading_zero_bits, Hasher256, Sha256Hasher};
pub use pins::{PinId, PinLevel, PinPair};
pub use scanner::{probe_pairs, run_sweep, scan_all_pairs, PairOutcome, ScanResult, SweepSummary};
pub use search::{HashSearch, IterationOutcome, SearchControl, SearchState};
#[cfg(feature = "std")]
pub use shared::SharedStats;
pub use sink::{ScanSink, SearchSink};
pub use stats::SearchStats;
pub use transport::{BusLease, BusTransport, ProbeOutcome};
pub use work::WorkBuffer;
