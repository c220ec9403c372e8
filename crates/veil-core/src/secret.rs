//! # Identity Secrets and Commitments
//!
//! A membership identity is a `(trapdoor, nullifier)` pair. Its public face
//! is the [`IdentityCommitment`], a one-way hash of the pair that sits as a
//! leaf in the group accumulator.
//!
//! Secrets are either generated at random or derived deterministically from
//! a wallet signature and a nonce, so the same signed message always
//! reproduces the same identity.
//!
//! ## Serialized Form
//!
//! `["<trapdoor hex>","<nullifier hex>"]`, a JSON array of two field
//! elements. [`IdentitySecret::parse`] is the only way back.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::IdentityError;
use crate::field::{hash_to_field, FieldElement};

const DOMAIN_TRAPDOOR: &str = "veil/identity-trapdoor";
const DOMAIN_NULLIFIER: &str = "veil/identity-nullifier";
const DOMAIN_SECRET: &str = "veil/identity-secret";
const DOMAIN_COMMITMENT: &str = "veil/identity-commitment";

/// A membership secret: trapdoor plus nullifier.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct IdentitySecret {
    trapdoor: FieldElement,
    nullifier: FieldElement,
}

impl IdentitySecret {
    /// Assemble a secret from its two components. Neither may be zero.
    pub fn new(trapdoor: FieldElement, nullifier: FieldElement) -> Result<Self, IdentityError> {
        if trapdoor.is_zero() || nullifier.is_zero() {
            return Err(IdentityError::MalformedSecret(
                "trapdoor and nullifier must both be non-zero".to_string(),
            ));
        }
        Ok(Self {
            trapdoor,
            nullifier,
        })
    }

    /// Fresh random secret.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let mut t = [0u8; 32];
            let mut n = [0u8; 32];
            rng.fill_bytes(&mut t);
            rng.fill_bytes(&mut n);
            let trapdoor = FieldElement::from_bytes_reduced(t);
            let nullifier = FieldElement::from_bytes_reduced(n);
            t.zeroize();
            n.zeroize();
            if let Ok(secret) = Self::new(trapdoor, nullifier) {
                return secret;
            }
        }
    }

    /// Deterministic secret from a wallet signature over the identity
    /// creation message, scoped by `nonce`.
    pub fn from_signature(signature: &[u8], nonce: u64) -> Result<Self, IdentityError> {
        if signature.is_empty() {
            return Err(IdentityError::MalformedSecret(
                "signature must not be empty".to_string(),
            ));
        }
        let nonce_bytes = nonce.to_be_bytes();
        let trapdoor = hash_to_field(DOMAIN_TRAPDOOR, &[signature, &nonce_bytes]);
        let nullifier = hash_to_field(DOMAIN_NULLIFIER, &[signature, &nonce_bytes]);
        Self::new(trapdoor, nullifier)
    }

    /// Trapdoor component.
    pub fn trapdoor(&self) -> &FieldElement {
        &self.trapdoor
    }

    /// Nullifier component.
    pub fn nullifier(&self) -> &FieldElement {
        &self.nullifier
    }

    /// The public commitment for this secret.
    pub fn commitment(&self) -> IdentityCommitment {
        let inner = hash_to_field(
            DOMAIN_SECRET,
            &[self.nullifier.as_bytes(), self.trapdoor.as_bytes()],
        );
        IdentityCommitment(hash_to_field(DOMAIN_COMMITMENT, &[inner.as_bytes()]))
    }

    /// Serialize to `["<trapdoor>","<nullifier>"]`.
    pub fn serialize(&self) -> String {
        format!(
            "[\"{}\",\"{}\"]",
            self.trapdoor.to_hex(),
            self.nullifier.to_hex()
        )
    }

    /// Parse the serialized form produced by [`IdentitySecret::serialize`].
    pub fn parse(serialized: &str) -> Result<Self, IdentityError> {
        let parts: Vec<String> = serde_json::from_str(serialized)
            .map_err(|e| IdentityError::MalformedSecret(format!("not a JSON string array: {e}")))?;
        let [trapdoor, nullifier]: [String; 2] = parts.try_into().map_err(|v: Vec<String>| {
            IdentityError::MalformedSecret(format!("expected 2 components, got {}", v.len()))
        })?;
        let trapdoor = FieldElement::from_hex(&trapdoor)
            .map_err(|e| IdentityError::MalformedSecret(format!("trapdoor: {e}")))?;
        let nullifier = FieldElement::from_hex(&nullifier)
            .map_err(|e| IdentityError::MalformedSecret(format!("nullifier: {e}")))?;
        Self::new(trapdoor, nullifier)
    }
}

impl fmt::Debug for IdentitySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySecret")
            .field("trapdoor", &"[REDACTED]")
            .field("nullifier", &"[REDACTED]")
            .finish()
    }
}

/// Public commitment to an [`IdentitySecret`]; the accumulator leaf value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityCommitment(FieldElement);

impl IdentityCommitment {
    /// Wrap a field element received from elsewhere (oracle, custody agent).
    pub fn from_field(value: FieldElement) -> Self {
        Self(value)
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        FieldElement::from_hex(s).map(Self)
    }

    /// The underlying field element.
    pub fn as_field(&self) -> &FieldElement {
        &self.0
    }

    /// Lowercase hex, the form used in oracle URLs.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl fmt::Display for IdentityCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}
