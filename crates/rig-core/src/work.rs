//! The 80-byte work buffer hashed by the search loop.
//!
//! Layout mirrors a block header; only the counter changes once the buffer
//! has been initialized.

use core::ops::Range;

/// Size of the work buffer in bytes.
pub const WORK_BUFFER_SIZE: usize = 80;

const VERSION: Range<usize> = 0..4;
/// Rolling/opaque fields, left zero.
const OPAQUE: Range<usize> = 4..68;
const TIMESTAMP: Range<usize> = 68..72;
const BITS: Range<usize> = 72..76;
const COUNTER: Range<usize> = 76..80;

/// Fixed-layout buffer with a little-endian counter at bytes 76..80.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkBuffer {
    bytes: [u8; WORK_BUFFER_SIZE],
}

impl WorkBuffer {
    /// Build a zeroed buffer with version, timestamp and bits filled in and
    /// the counter at zero.
    pub fn new(version: u32, timestamp: u32, bits: u32) -> Self {
        let mut bytes = [0u8; WORK_BUFFER_SIZE];
        bytes[VERSION].copy_from_slice(&version.to_le_bytes());
        bytes[TIMESTAMP].copy_from_slice(&timestamp.to_le_bytes());
        bytes[BITS].copy_from_slice(&bits.to_le_bytes());
        WorkBuffer { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; WORK_BUFFER_SIZE] {
        &self.bytes
    }

    pub fn version(&self) -> u32 {
        self.read_u32(VERSION)
    }

    pub fn timestamp(&self) -> u32 {
        self.read_u32(TIMESTAMP)
    }

    pub fn bits(&self) -> u32 {
        self.read_u32(BITS)
    }

    pub fn counter(&self) -> u32 {
        self.read_u32(COUNTER)
    }

    pub fn opaque(&self) -> &[u8] {
        &self.bytes[OPAQUE]
    }

    pub fn set_counter(&mut self, counter: u32) {
        self.bytes[COUNTER].copy_from_slice(&counter.to_le_bytes());
    }

    /// Increment the counter in place, wrapping at 2^32, and return it.
    pub fn advance(&mut self) -> u32 {
        let next = self.counter().wrapping_add(1);
        self.set_counter(next);
        next
    }

    fn read_u32(&self, range: Range<usize>) -> u32 {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[range]);
        u32::from_le_bytes(word)
    }
}
