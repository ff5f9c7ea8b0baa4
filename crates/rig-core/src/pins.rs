//! GPIO pin identifiers and the candidate pairs the sweep walks through.

use core::fmt;

/// A GPIO number on the target chip.
pub type PinId = u8;

/// Pins on the ESP32-S3 considered safe for bus signalling.
pub const S3_CANDIDATES: [PinId; 19] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 21,
];

/// Pins that must never carry a probe: 0 is a strapping pin, 19/20 are
/// USB D-/D+ and 46 is input-only.
pub const S3_EXCLUDED: [PinId; 4] = [0, 19, 20, 46];

/// An ordered (data, clock) pin assignment for one bus attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinPair {
    /// Pin carrying SDA.
    pub data: PinId,
    /// Pin carrying SCL.
    pub clock: PinId,
}

impl PinPair {
    pub const fn new(data: PinId, clock: PinId) -> Self {
        PinPair { data, clock }
    }

    /// True when both pins are distinct and neither is in `excluded`.
    pub fn is_usable(&self, excluded: &[PinId]) -> bool {
        self.data != self.clock
            && !excluded.contains(&self.data)
            && !excluded.contains(&self.clock)
    }
}

impl fmt::Display for PinPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SDA={} SCL={}", self.data, self.clock)
    }
}

/// Logic level sampled on an idle line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
}

impl PinLevel {
    pub fn as_bit(&self) -> u8 {
        match self {
            PinLevel::Low => 0,
            PinLevel::High => 1,
        }
    }
}

impl From<bool> for PinLevel {
    fn from(high: bool) -> Self {
        if high {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    }
}

/// Iterator over every usable pair drawn from `data × clock`.
///
/// Pairs with equal members or an excluded member are skipped without being
/// yielded. The iterator is cheap to rebuild, so a sweep can be restarted
/// by creating a new one.
#[derive(Debug, Clone)]
pub struct PairIter<'a> {
    data: &'a [PinId],
    clock: &'a [PinId],
    excluded: &'a [PinId],
    i: usize,
    j: usize,
}

impl<'a> PairIter<'a> {
    pub fn new(data: &'a [PinId], clock: &'a [PinId], excluded: &'a [PinId]) -> Self {
        PairIter {
            data,
            clock,
            excluded,
            i: 0,
            j: 0,
        }
    }
}

impl Iterator for PairIter<'_> {
    type Item = PinPair;

    fn next(&mut self) -> Option<PinPair> {
        while self.i < self.data.len() {
            if self.j >= self.clock.len() {
                self.i += 1;
                self.j = 0;
                continue;
            }
            let pair = PinPair::new(self.data[self.i], self.clock[self.j]);
            self.j += 1;
            if pair.is_usable(self.excluded) {
                return Some(pair);
            }
        }
        None
    }
}

/// All ordered pairs of `candidates × candidates` the sweep will attempt.
pub fn candidate_pairs<'a>(candidates: &'a [PinId], excluded: &'a [PinId]) -> PairIter<'a> {
    PairIter::new(candidates, candidates, excluded)
}
