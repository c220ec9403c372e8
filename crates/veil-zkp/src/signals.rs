//! Public signals and the proof envelope attached to outgoing messages.

use serde::{Deserialize, Serialize};
use veil_core::{hash_to_field, FieldElement, MessageDigest};

/// Fixed seed for the post action category.
pub const POST_SEED: &str = "POST";

/// Derive the external nullifier for an action category.
///
/// Distinct seeds give unrelated nullifiers, so one identity's activity in
/// different categories cannot be linked by nullifier reuse.
pub fn external_nullifier(seed: &str) -> FieldElement {
    hash_to_field("veil/external-nullifier", &[seed.as_bytes()])
}

/// Per-identity, per-category nullifier hash.
pub(crate) fn nullifier_hash(
    identity_nullifier: &FieldElement,
    external_nullifier: &FieldElement,
) -> FieldElement {
    hash_to_field(
        "veil/nullifier-hash",
        &[identity_nullifier.as_bytes(), external_nullifier.as_bytes()],
    )
}

/// The values a verifier sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSignals {
    pub merkle_root: FieldElement,
    pub nullifier_hash: FieldElement,
    pub signal_hash: FieldElement,
    pub external_nullifier: FieldElement,
}

impl PublicSignals {
    /// Whether these signals commit to `digest` under the action `seed`.
    pub fn binds(&self, digest: &MessageDigest, seed: &str) -> bool {
        self.signal_hash == digest.to_field() && self.external_nullifier == external_nullifier(seed)
    }
}

/// A proof plus its public signals, attached verbatim to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipProof {
    /// Backend-specific proof blob.
    pub proof: serde_json::Value,
    pub public_signals: PublicSignals,
}
