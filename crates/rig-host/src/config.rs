//! Runner configuration.
//!
//! Everything has a default, so an absent or partial JSON file still gives
//! a runnable rig. The file path comes from `RIG_CONFIG`.

use std::env;
use std::fs;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use rig_core::address::OLED_ADDRESSES;
use rig_core::transport::sim::SimTransport;
use rig_core::{PinId, PinPair, SearchConfig, SweepConfig};
use serde::{Deserialize, Serialize};

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "RIG_CONFIG";

/// Reader-side wait for the statistics lock before a frame is skipped.
pub const LOCK_TIMEOUT_MS: u64 = 20;

/// Interval between status frames.
pub const POLL_INTERVAL_MS: u64 = 2_000;

/// Full contrast, as the panel is driven on the bench.
pub const DEFAULT_CONTRAST: u8 = 0xFF;

pub const DEFAULT_TITLE: &str = "ESP32-S3 Miner";

/// Which status display the telemetry loop renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayKind {
    /// Status lines go to the log.
    Log,
    /// An 8-page text panel modelled on the 128x64 OLED. Falls back to
    /// `Log` when the boot sweep finds nothing at an OLED address.
    Panel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub display: DisplayKind,
    pub title: String,
    pub contrast: u8,
    pub lock_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            display: DisplayKind::Panel,
            title: DEFAULT_TITLE.to_string(),
            contrast: DEFAULT_CONTRAST,
            lock_timeout_ms: LOCK_TIMEOUT_MS,
            poll_interval_ms: POLL_INTERVAL_MS,
        }
    }
}

impl TelemetryConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Targeted probe of a few likely wirings after the sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub sda: Vec<PinId>,
    pub scl: Vec<PinId>,
    pub addresses: Vec<u8>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            sda: vec![8, 15, 7],
            scl: vec![1, 2, 3, 4, 9],
            addresses: OLED_ADDRESSES.to_vec(),
        }
    }
}

/// A device attached to the simulated bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimDevice {
    pub sda: PinId,
    pub scl: PinId,
    pub address: u8,
}

/// Simulated wiring the host runs the sweep against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub devices: Vec<SimDevice>,
    /// Pins whose bus install fails.
    pub faulty_pins: Vec<PinId>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            devices: vec![SimDevice {
                sda: 15,
                scl: 9,
                address: OLED_ADDRESSES[0],
            }],
            faulty_pins: Vec::new(),
        }
    }
}

impl SimConfig {
    pub fn build_transport(&self) -> SimTransport {
        let transport = self.devices.iter().fold(SimTransport::new(), |t, d| {
            t.with_device(PinPair::new(d.sda, d.scl), d.address)
        });
        self.faulty_pins
            .iter()
            .fold(transport, |t, pin| t.with_faulty_pin(*pin))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub sweep: SweepConfig,
    pub search: SearchConfig,
    pub telemetry: TelemetryConfig,
    /// Run a targeted probe after the sweep when set.
    pub probe: Option<ProbeConfig>,
    pub sim: SimConfig,
    /// Stop after this many seconds; run until killed when unset.
    pub run_seconds: Option<u64>,
}

impl RigConfig {
    /// Load from the file named by `RIG_CONFIG`, or defaults when unset.
    pub fn load() -> Result<Self> {
        match env::var_os(CONFIG_ENV) {
            Some(path) => {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.to_string_lossy()))?;
                Self::from_json(&text)
                    .with_context(|| format!("parsing {}", path.to_string_lossy()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.sweep.validate().context("sweep")?;
        self.search.validate().context("search")?;
        ensure!(
            self.telemetry.poll_interval_ms > 0,
            "telemetry poll interval must be non-zero"
        );
        if let Some(probe) = &self.probe {
            ensure!(
                !probe.sda.is_empty() && !probe.scl.is_empty(),
                "targeted probe needs at least one SDA and one SCL pin"
            );
            ensure!(
                probe.addresses.iter().all(|a| *a <= 0x7F),
                "targeted probe addresses must be 7-bit"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_core::BusTransport;

    #[test]
    fn test_defaults_are_valid() {
        let config = RigConfig::default();
        config.validate().unwrap();
        assert_eq!(config.telemetry.lock_timeout(), Duration::from_millis(20));
        assert_eq!(config.telemetry.display, DisplayKind::Panel);
        assert!(config.probe.is_none());
        assert!(config.run_seconds.is_none());
    }

    #[test]
    fn test_partial_json() {
        let config = RigConfig::from_json(
            r#"{
                "search": { "solution_threshold": 16, "cooldown_ms": 0 },
                "telemetry": { "display": "log" },
                "probe": {},
                "run_seconds": 5
            }"#,
        )
        .unwrap();

        assert_eq!(config.search.solution_threshold, 16);
        assert_eq!(config.search.cooldown_ms, 0);
        assert_eq!(config.search.report_interval_ms, 2_000);
        assert_eq!(config.telemetry.display, DisplayKind::Log);
        assert_eq!(config.telemetry.contrast, 0xFF);
        assert_eq!(config.probe, Some(ProbeConfig::default()));
        assert_eq!(config.run_seconds, Some(5));
        assert_eq!(config.sweep, SweepConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RigConfig::default();
        config.sweep.candidates.clear();
        assert!(config.validate().is_err());

        let mut config = RigConfig::default();
        config.search.yield_every = 0;
        assert!(config.validate().is_err());

        let mut config = RigConfig::default();
        config.telemetry.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = RigConfig::default();
        config.probe = Some(ProbeConfig {
            scl: Vec::new(),
            ..ProbeConfig::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_display_kind_fails() {
        let err = RigConfig::from_json(r#"{ "telemetry": { "display": "vga" } }"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_sim_transport_from_config() {
        let sim = SimConfig {
            devices: vec![SimDevice { sda: 5, scl: 6, address: 0x3C }],
            faulty_pins: vec![7],
        };
        let mut transport = sim.build_transport();

        assert!(transport.init_bus(PinPair::new(7, 5), 100_000).is_err());
        let mut bus = transport.init_bus(PinPair::new(5, 6), 100_000).unwrap();
        let ack = transport
            .probe_address(&mut bus, 0x3C, Duration::from_millis(50))
            .unwrap();
        assert_eq!(ack, rig_core::ProbeOutcome::Ack);
        transport.release_bus(bus);
    }
}
