//! SHA256 double-hashing and leading-zero scoring.

use alloc::string::String;
use core::convert::Infallible;
use core::fmt;

use sha2::{Digest, Sha256};

/// A 256-bit digest function.
///
/// The search loop is generic over this so tests can substitute a stub; the
/// real primitive never fails.
pub trait Hasher256 {
    type Error: fmt::Debug;

    /// Digest `data` into 32 bytes. Must be a pure function of `data`.
    fn digest256(&mut self, data: &[u8]) -> Result<[u8; 32], Self::Error>;
}

/// SHA256 via the `sha2` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Hasher256 for Sha256Hasher {
    type Error = Infallible;

    #[inline]
    fn digest256(&mut self, data: &[u8]) -> Result<[u8; 32], Infallible> {
        Ok(sha256(data))
    }
}

/// Apply `hasher` twice: over `data`, then over the 32-byte intermediate.
#[inline]
pub fn double_digest<H: Hasher256>(hasher: &mut H, data: &[u8]) -> Result<[u8; 32], H::Error> {
    let first = hasher.digest256(data)?;
    hasher.digest256(&first)
}

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// Single SHA256 hash.
#[inline]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

/// Count leading zero bits, most significant end first.
///
/// The digest is little-endian, so byte 31 is the most significant. Whole
/// zero bytes count 8 each; the first nonzero byte adds its own leading
/// zeros and ends the count.
pub fn leading_zero_bits(hash: &[u8; 32]) -> u32 {
    let mut zeros = 0u32;
    for byte in hash.iter().rev() {
        if *byte == 0 {
            zeros += 8;
        } else {
            zeros += byte.leading_zeros();
            break;
        }
    }
    zeros
}

/// Reverse the byte order of a 32-byte array.
#[inline]
pub fn reverse_bytes(bytes: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Full digest as hex, most significant byte first.
pub fn hash_to_display_hex(hash: &[u8; 32]) -> String {
    hex::encode(reverse_bytes(hash))
}

/// Abbreviated digest for log lines: top four bytes, `...`, bottom four.
pub fn short_display(hash: &[u8; 32]) -> String {
    let display = reverse_bytes(hash);
    let mut out = hex::encode(&display[..4]);
    out.push_str("...");
    out.push_str(&hex::encode(&display[28..]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_sha256() {
        // Test vector: SHA256d("hello")
        let hash = double_sha256(b"hello");
        let expected = hex::decode(
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        ).unwrap();

        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_double_digest_matches_double_sha256() {
        let buffer = [0x5Au8; 80];
        let mut hasher = Sha256Hasher;
        let via_trait = double_digest(&mut hasher, &buffer).unwrap();

        assert_eq!(via_trait, double_sha256(&buffer));
        // Same input, same output
        assert_eq!(double_digest(&mut hasher, &buffer).unwrap(), via_trait);
    }

    #[test]
    fn test_leading_zero_bits() {
        assert_eq!(leading_zero_bits(&[0x00; 32]), 256);
        assert_eq!(leading_zero_bits(&[0xFF; 32]), 0);

        let mut hash = [0u8; 32];
        hash[29] = 0x01; // 16 zeros + 7 zeros
        assert_eq!(leading_zero_bits(&hash), 23);

        let mut hash = [0u8; 32];
        hash[31] = 0x0F;
        assert_eq!(leading_zero_bits(&hash), 4);

        let mut hash = [0u8; 32];
        hash[30] = 0x80;
        assert_eq!(leading_zero_bits(&hash), 8);
    }

    #[test]
    fn test_leading_zero_bits_ignores_low_bytes() {
        let mut hash = [0xFF; 32];
        hash[31] = 0x00;
        hash[30] = 0x00;
        hash[29] = 0x0F;
        assert_eq!(leading_zero_bits(&hash), 20);
    }

    #[test]
    fn test_display_formats() {
        let mut hash = [0u8; 32];
        for (i, byte) in hash.iter_mut().enumerate() {
            *byte = i as u8;
        }
        assert_eq!(short_display(&hash), "1f1e1d1c...03020100");
        assert!(hash_to_display_hex(&hash).starts_with("1f1e1d"));
        assert!(hash_to_display_hex(&hash).ends_with("020100"));
    }
}
