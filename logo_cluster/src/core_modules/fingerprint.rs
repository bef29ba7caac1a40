// THEORY:
// A `Fingerprint` is the compact, comparison-only summary of a logo. It is a
// fixed 64-bit vector produced by the `FingerprintEngine`; two fingerprints are
// never ordered, only measured against each other by Hamming distance (the
// number of bit positions in which they differ).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of bits in a fingerprint.
pub const FINGERPRINT_BITS: u32 = u64::BITS;

/// A 64-bit perceptual fingerprint. Bit 63 holds the first (top-left)
/// retained coefficient, bit 0 the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Number of differing bit positions. Symmetric by construction.
    #[inline]
    pub fn distance(self, other: Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Whether `other` lies within `threshold` bits of `self`.
    #[inline]
    pub fn is_similar(self, other: Fingerprint, threshold: u32) -> bool {
        self.distance(other) <= threshold
    }
}

impl From<u64> for Fingerprint {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::LowerHex for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
