//! Bus transport abstraction used by the pin sweep.
//!
//! The sweep needs four things from the hardware: configure a bus on a pin
//! pair, send an address-only write and see whether it was acknowledged,
//! tear the bus down again, and read the idle level of a pin. Anything that
//! can do that implements [`BusTransport`].

use core::fmt;
use core::time::Duration;

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

use crate::pins::{PinId, PinLevel, PinPair};

pub mod sim;

/// Result of a successful probe transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A device pulled SDA low during the address phase.
    Ack,
    /// Nobody answered.
    Nack,
}

/// Blocking bus operations the sweep is built on.
pub trait BusTransport {
    /// Handle for a configured bus instance.
    type Bus;
    /// Error reported by bus initialization or a failed transaction.
    type Error: fmt::Debug;

    /// Configure a bus on `pair` at `clock_hz`.
    fn init_bus(&mut self, pair: PinPair, clock_hz: u32) -> Result<Self::Bus, Self::Error>;

    /// Send a zero-length write to `address` and report whether it was
    /// acknowledged. A NACK is an `Ok`, not an error.
    fn probe_address(
        &mut self,
        bus: &mut Self::Bus,
        address: u8,
        timeout: Duration,
    ) -> Result<ProbeOutcome, Self::Error>;

    /// Tear down a bus returned by [`init_bus`](Self::init_bus).
    fn release_bus(&mut self, bus: Self::Bus);

    /// Tear down whatever a failed [`init_bus`](Self::init_bus) left
    /// behind. Must be a no-op when nothing is held.
    fn recover(&mut self) {}

    /// Sample the current logic level of `pin`.
    fn read_pin_level(&mut self, pin: PinId) -> PinLevel;
}

/// A bus held for the duration of one pin pair.
///
/// The bus is handed back to the transport when the lease is dropped, so
/// every exit path out of a pair scan releases it.
pub struct BusLease<'t, T: BusTransport> {
    transport: &'t mut T,
    bus: Option<T::Bus>,
    pair: PinPair,
}

impl<'t, T: BusTransport> BusLease<'t, T> {
    /// Initialize a bus on `pair`. On failure the transport is asked to
    /// recover before the error is returned.
    pub fn acquire(transport: &'t mut T, pair: PinPair, clock_hz: u32) -> Result<Self, T::Error> {
        match transport.init_bus(pair, clock_hz) {
            Ok(bus) => Ok(BusLease {
                transport,
                bus: Some(bus),
                pair,
            }),
            Err(e) => {
                transport.recover();
                Err(e)
            }
        }
    }

    pub fn pair(&self) -> PinPair {
        self.pair
    }

    pub fn probe(&mut self, address: u8, timeout: Duration) -> Result<ProbeOutcome, T::Error> {
        match self.bus.as_mut() {
            Some(bus) => self.transport.probe_address(bus, address, timeout),
            None => Ok(ProbeOutcome::Nack),
        }
    }

    /// Idle levels of (data, clock).
    pub fn idle_levels(&mut self) -> (PinLevel, PinLevel) {
        (
            self.transport.read_pin_level(self.pair.data),
            self.transport.read_pin_level(self.pair.clock),
        )
    }

    /// Release the bus now rather than at the end of scope.
    pub fn release(self) {}
}

impl<T: BusTransport> Drop for BusLease<'_, T> {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.take() {
            self.transport.release_bus(bus);
        }
    }
}

/// Probe `address` on an `embedded-hal` bus with an address-only write.
///
/// Reads are avoided: a device that drives SDA low during a read with no
/// master clocking it out can hang the bus.
pub fn probe_write<I: I2c>(i2c: &mut I, address: u8) -> Result<ProbeOutcome, I::Error> {
    match i2c.write(address, &[]) {
        Ok(()) => Ok(ProbeOutcome::Ack),
        Err(e) if matches!(e.kind(), ErrorKind::NoAcknowledge(_)) => Ok(ProbeOutcome::Nack),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::sim::{SimError, SimTransport};
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(50);

    #[test]
    fn test_lease_releases_on_drop() {
        let mut transport = SimTransport::new().with_device(PinPair::new(5, 6), 0x3C);
        {
            let mut lease = BusLease::acquire(&mut transport, PinPair::new(5, 6), 100_000).unwrap();
            assert_eq!(lease.probe(0x3C, TIMEOUT).unwrap(), ProbeOutcome::Ack);
            assert_eq!(lease.probe(0x3D, TIMEOUT).unwrap(), ProbeOutcome::Nack);
        }
        assert_eq!(transport.log().releases, 1);
        assert!(!transport.is_open());
    }

    #[test]
    fn test_failed_acquire_recovers() {
        let mut transport = SimTransport::new().with_faulty_pin(7);
        let err = match BusLease::acquire(&mut transport, PinPair::new(7, 8), 100_000) {
            Ok(_) => panic!("faulty pin must not yield a lease"),
            Err(e) => e,
        };

        assert_eq!(err, SimError::InvalidPin(7));
        assert_eq!(transport.log().recoveries, 1);
        assert_eq!(transport.log().releases, 0);
    }

    #[test]
    fn test_second_acquire_requires_release() {
        let mut transport = SimTransport::new();
        let bus = transport.init_bus(PinPair::new(1, 2), 100_000).unwrap();
        assert!(matches!(
            transport.init_bus(PinPair::new(2, 1), 100_000),
            Err(SimError::Busy)
        ));
        transport.release_bus(bus);
        assert!(transport.init_bus(PinPair::new(2, 1), 100_000).is_ok());
    }

    #[test]
    fn test_probe_write_maps_bus_errors() {
        let mut transport = SimTransport::new().with_glitch(PinPair::new(1, 2), 0x50);
        let mut bus = transport.init_bus(PinPair::new(1, 2), 100_000).unwrap();

        assert_eq!(probe_write(&mut bus, 0x20).unwrap(), ProbeOutcome::Nack);
        assert!(matches!(probe_write(&mut bus, 0x50), Err(SimError::Bus)));
    }
}
