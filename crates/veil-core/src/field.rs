//! # Field Elements
//!
//! The membership circuit works over the BN254 scalar field. Every value
//! that enters a witness (secrets, commitments, siblings, roots, signal
//! hashes, external nullifiers) is a [`FieldElement`]: 32 big-endian bytes
//! strictly below the field modulus.
//!
//! Wire form is lowercase hex without a prefix. Parsing accepts an optional
//! `0x` prefix and short values (left-padded with zeros).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::IdentityError;

/// BN254 scalar field modulus, big-endian.
pub const FIELD_MODULUS: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29, 0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58, 0x5d,
    0x28, 0x33, 0xe8, 0x48, 0x79, 0xb9, 0x70, 0x91, 0x43, 0xe1, 0xf5, 0x93, 0xf0, 0x00, 0x00, 0x01,
];

/// An element of the BN254 scalar field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Zeroize)]
pub struct FieldElement([u8; 32]);

impl FieldElement {
    /// The zero element.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Build a field element from big-endian bytes, rejecting values at or
    /// above the modulus.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, IdentityError> {
        if bytes >= FIELD_MODULUS {
            return Err(IdentityError::InvalidFieldElement(
                "value is not below the field modulus".to_string(),
            ));
        }
        Ok(Self(bytes))
    }

    /// Map 32 arbitrary bytes into the field by clearing the top three bits.
    ///
    /// The result is below 2^253, which is below the modulus.
    pub fn from_bytes_reduced(mut bytes: [u8; 32]) -> Self {
        bytes[0] &= 0x1f;
        Self(bytes)
    }

    /// Map a 32-byte digest into the field by shifting right one byte.
    ///
    /// Mirrors the `hash >> 8` convention used for Semaphore signal hashes.
    pub fn from_digest_shifted(digest: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 32];
        bytes[1..].copy_from_slice(&digest[..31]);
        Self(bytes)
    }

    /// Small integers, mostly for tests and path construction.
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Access the big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, 64 characters, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse hex with an optional `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        if trimmed.is_empty() || trimmed.len() > 64 {
            return Err(IdentityError::InvalidFieldElement(format!(
                "expected 1..=64 hex chars, got {}",
                trimmed.len()
            )));
        }
        let padded = format!("{trimmed:0>64}");
        let decoded = hex::decode(&padded)
            .map_err(|e| IdentityError::InvalidFieldElement(format!("{s:?}: {e}")))?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);
        Self::from_bytes(bytes)
    }

    /// Whether this is the zero element.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for FieldElement {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Domain-separated hash into the field.
///
/// `SHA256(len(domain) || domain || len(part_0) || part_0 || ...)`, reduced
/// with [`FieldElement::from_bytes_reduced`]. Length prefixes keep
/// `("ab", "c")` and `("a", "bc")` distinct.
pub fn hash_to_field(domain: &str, parts: &[&[u8]]) -> FieldElement {
    let mut hasher = Sha256::new();
    hasher.update((domain.len() as u64).to_be_bytes());
    hasher.update(domain.as_bytes());
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    FieldElement::from_bytes_reduced(bytes)
}
