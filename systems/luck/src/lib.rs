#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic, hash-based luck used to place caches and size their hoards.
//!
//! Values depend only on the key text, never on call order or process state,
//! so the same player path always rediscovers the same world.

use sha2::{Digest, Sha256};

const UNIT_SCALE: f64 = 1.0 / ((1u64 << 53) as f64);

/// Source of reproducible values in `[0, 1)` keyed by arbitrary strings.
pub trait Luck {
    /// Maps the key to a value in `[0, 1)`.
    fn value_for(&self, key: &str) -> f64;
}

/// Default luck source backed by SHA-256.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sha256Luck;

impl Luck for Sha256Luck {
    fn value_for(&self, key: &str) -> f64 {
        value_for(key)
    }
}

impl<L: Luck + ?Sized> Luck for &L {
    fn value_for(&self, key: &str) -> f64 {
        (**self).value_for(key)
    }
}

/// Maps the key to a reproducible value in `[0, 1)`.
///
/// The key is hashed with SHA-256; the first eight digest bytes are read as a
/// little-endian integer whose top 53 bits become the mantissa of the result.
/// Neighbouring keys such as `"2,3"` and `"2,4"` land on unrelated values.
#[must_use]
pub fn value_for(key: &str) -> f64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    let value = u64::from_le_bytes(bytes) >> 11;
    (value as f64) * UNIT_SCALE
}
