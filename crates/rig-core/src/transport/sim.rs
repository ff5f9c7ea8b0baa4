//! Simulated transport for host runs and tests.
//!
//! Devices are attached to a specific pin pair and only answer when the bus
//! is configured on exactly that pair. Every bus operation is recorded so
//! callers can check how the sweep drove the hardware.

use alloc::vec::Vec;
use core::time::Duration;

use embedded_hal::i2c::{self, ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

use super::{probe_write, BusTransport, ProbeOutcome};
use crate::address::AddressSet;
use crate::pins::{PinId, PinLevel, PinPair};

/// Errors raised by the simulated bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// The pin cannot be routed to the I2C peripheral.
    #[error("pin {0} cannot be used for I2C")]
    InvalidPin(PinId),
    /// A bus is already installed and was never released.
    #[error("bus already installed")]
    Busy,
    /// The address was not acknowledged.
    #[error("no acknowledge")]
    Nack,
    /// The transaction failed for electrical reasons.
    #[error("bus error")]
    Bus,
}

impl i2c::Error for SimError {
    fn kind(&self) -> ErrorKind {
        match self {
            SimError::Nack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            SimError::Bus => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}

/// Record of everything the transport was asked to do.
#[derive(Debug, Clone, Default)]
pub struct SimLog {
    /// Pairs passed to `init_bus`, including ones that failed.
    pub inits: Vec<PinPair>,
    /// Every probed (pair, address).
    pub probes: Vec<(PinPair, u8)>,
    /// Clock rates requested by `init_bus`.
    pub clock_rates: Vec<u32>,
    pub releases: usize,
    pub recoveries: usize,
}

impl SimLog {
    /// Number of probes issued while the bus was on `pair`.
    pub fn probes_on(&self, pair: PinPair) -> usize {
        self.probes.iter().filter(|(p, _)| *p == pair).count()
    }
}

/// A bus instance configured on one pin pair.
#[derive(Debug, Clone)]
pub struct SimBus {
    pair: PinPair,
    devices: AddressSet,
    glitches: AddressSet,
}

impl SimBus {
    pub fn pair(&self) -> PinPair {
        self.pair
    }
}

impl ErrorType for SimBus {
    type Error = SimError;
}

impl i2c::I2c for SimBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.glitches.contains(address) {
            return Err(SimError::Bus);
        }
        if !self.devices.contains(address) {
            return Err(SimError::Nack);
        }
        for op in operations.iter_mut() {
            if let Operation::Read(buf) = op {
                buf.fill(0);
            }
        }
        Ok(())
    }
}

/// Simulated multi-pin transport.
#[derive(Debug, Clone, Default)]
pub struct SimTransport {
    devices: Vec<(PinPair, u8)>,
    glitches: Vec<(PinPair, u8)>,
    faulty_pins: Vec<PinId>,
    stuck_low: Vec<PinId>,
    open: bool,
    log: SimLog,
}

impl SimTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device answering at `address` when the bus runs on `pair`.
    pub fn with_device(mut self, pair: PinPair, address: u8) -> Self {
        self.devices.push((pair, address));
        self
    }

    /// Make `address` fail with a bus error on `pair`.
    pub fn with_glitch(mut self, pair: PinPair, address: u8) -> Self {
        self.glitches.push((pair, address));
        self
    }

    /// Make bus initialization fail whenever `pin` is part of the pair.
    pub fn with_faulty_pin(mut self, pin: PinId) -> Self {
        self.faulty_pins.push(pin);
        self
    }

    /// Make `pin` read low while idle.
    pub fn with_stuck_low(mut self, pin: PinId) -> Self {
        self.stuck_low.push(pin);
        self
    }

    pub fn log(&self) -> &SimLog {
        &self.log
    }

    /// Forget recorded operations, keeping the device layout.
    pub fn clear_log(&mut self) {
        self.log = SimLog::default();
    }

    /// True while a bus is installed.
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn addresses_on(list: &[(PinPair, u8)], pair: PinPair) -> AddressSet {
        list.iter()
            .filter(|(p, _)| *p == pair)
            .map(|(_, a)| *a)
            .collect()
    }
}

impl BusTransport for SimTransport {
    type Bus = SimBus;
    type Error = SimError;

    fn init_bus(&mut self, pair: PinPair, clock_hz: u32) -> Result<SimBus, SimError> {
        self.log.inits.push(pair);
        self.log.clock_rates.push(clock_hz);
        if self.open {
            return Err(SimError::Busy);
        }
        if let Some(pin) = [pair.data, pair.clock]
            .into_iter()
            .find(|pin| self.faulty_pins.contains(pin))
        {
            return Err(SimError::InvalidPin(pin));
        }
        self.open = true;
        Ok(SimBus {
            pair,
            devices: Self::addresses_on(&self.devices, pair),
            glitches: Self::addresses_on(&self.glitches, pair),
        })
    }

    fn probe_address(
        &mut self,
        bus: &mut SimBus,
        address: u8,
        _timeout: Duration,
    ) -> Result<ProbeOutcome, SimError> {
        self.log.probes.push((bus.pair, address));
        probe_write(bus, address)
    }

    fn release_bus(&mut self, _bus: SimBus) {
        self.open = false;
        self.log.releases += 1;
    }

    fn recover(&mut self) {
        self.log.recoveries += 1;
    }

    fn read_pin_level(&mut self, pin: PinId) -> PinLevel {
        PinLevel::from(!self.stuck_low.contains(&pin))
    }
}
