//! 7-bit I2C address sets.
//!
//! The sweep records acknowledged addresses in a 128-bit bitmap, one bit per
//! possible 7-bit address, so a scan result never allocates.

use core::fmt;

/// Lowest address the sweep probes. 0x00 is the general call address.
pub const FIRST_PROBE_ADDRESS: u8 = 0x01;

/// Highest address the sweep probes. 0x7F is reserved.
pub const LAST_PROBE_ADDRESS: u8 = 0x7E;

/// Common addresses of SSD1306/SSD1315 OLED controllers.
pub const OLED_ADDRESSES: [u8; 2] = [0x3C, 0x3D];

/// A set of 7-bit addresses.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AddressSet(u128);

impl AddressSet {
    pub const fn new() -> Self {
        AddressSet(0)
    }

    /// Add `address` to the set. Returns false for values above 0x7F or
    /// addresses already present.
    pub fn insert(&mut self, address: u8) -> bool {
        if address > 0x7F || self.contains(address) {
            return false;
        }
        self.0 |= 1u128 << address;
        true
    }

    pub fn contains(&self, address: u8) -> bool {
        address <= 0x7F && self.0 & (1u128 << address) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Addresses in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0u8..=0x7F).filter(move |a| self.contains(*a))
    }
}

impl FromIterator<u8> for AddressSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = AddressSet::new();
        for address in iter {
            set.insert(address);
        }
        set
    }
}

impl fmt::Debug for AddressSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(HexAddress))
            .finish()
    }
}

impl fmt::Display for AddressSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for address in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}", HexAddress(address))?;
            first = false;
        }
        Ok(())
    }
}

struct HexAddress(u8);

impl fmt::Debug for HexAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

impl fmt::Display for HexAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}
