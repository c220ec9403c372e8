//! # Identity Records
//!
//! [`IdentityRecord`] is the sum type over the four identity variants the
//! subsystem handles. Every variant carries an optional chain `address` and
//! a `nonce` (the input that, together with a wallet signature, reproduces
//! the identity deterministically).
//!
//! | Variant              | Secret material held locally       | Proof path       |
//! |----------------------|------------------------------------|------------------|
//! | `direct_key`         | Ed25519 private key                | signature        |
//! | `membership`         | serialized trapdoor + nullifier    | local prover     |
//! | `custody_membership` | none (held by the custody agent)   | custody bridge   |
//! | `event`              | serialized trapdoor + nullifier    | local prover     |
//!
//! ## Wire Form
//!
//! Internally tagged on `type` with snake_case discriminants and camelCase
//! fields, e.g. `{"type":"direct_key","address":"0xabc","nonce":0,
//! "publicKey":"…","privateKey":"…"}`.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::IdentityError;
use crate::group::GroupRef;
use crate::merkle::MerklePath;
use crate::secret::{IdentityCommitment, IdentitySecret};

// ─── SecretString ──────────────────────────────────────────────────────

/// A string holding secret material. Redacted in `Debug`, zeroized on drop.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The empty secret, used for redacted records.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Borrow the secret. Callers must not log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Whether no secret is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("SecretString(<empty>)")
        } else {
            f.write_str("SecretString([REDACTED])")
        }
    }
}

// ─── Variants ──────────────────────────────────────────────────────────

/// Direct-key identity: authenticates with an Ed25519 keypair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectKeyIdentity {
    #[serde(default)]
    pub address: Option<String>,
    pub nonce: u64,
    pub public_key: String,
    #[serde(default)]
    pub private_key: SecretString,
}

/// Local membership identity: the secret is held in application state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipIdentity {
    #[serde(default)]
    pub address: Option<String>,
    pub nonce: u64,
    #[serde(default)]
    pub serialized_secret: SecretString,
    pub identity_commitment: IdentityCommitment,
    pub provider: String,
    pub reputation_tier: String,
    #[serde(default)]
    pub identity_path: Option<MerklePath>,
}

impl MembershipIdentity {
    /// Build a membership identity from a freshly generated or derived
    /// secret. This is the only place the commitment is computed.
    pub fn from_secret(
        secret: &IdentitySecret,
        nonce: u64,
        address: Option<String>,
        provider: impl Into<String>,
        reputation_tier: impl Into<String>,
    ) -> Self {
        Self {
            address,
            nonce,
            serialized_secret: SecretString::new(secret.serialize()),
            identity_commitment: secret.commitment(),
            provider: provider.into(),
            reputation_tier: reputation_tier.into(),
            identity_path: None,
        }
    }
}

/// Custody-delegated membership identity: no secret material, ever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustodyMembershipIdentity {
    #[serde(default)]
    pub address: Option<String>,
    pub nonce: u64,
    pub identity_commitment: IdentityCommitment,
    pub provider: String,
    pub reputation_tier: String,
    #[serde(default)]
    pub identity_path: Option<MerklePath>,
}

/// Event-scoped membership identity with a per-session seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventIdentity {
    #[serde(default)]
    pub address: Option<String>,
    pub nonce: u64,
    #[serde(default)]
    pub serialized_secret: SecretString,
    pub identity_commitment: IdentityCommitment,
    pub event_id: String,
    /// Hex-encoded random seed, fresh per session.
    pub session_seed: String,
    #[serde(default)]
    pub identity_path: Option<MerklePath>,
}

impl EventIdentity {
    /// New event identity with a fresh random secret and session seed.
    pub fn generate(event_id: impl Into<String>, nonce: u64, address: Option<String>) -> Self {
        let secret = IdentitySecret::generate();
        let mut seed = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut seed);
        Self {
            address,
            nonce,
            serialized_secret: SecretString::new(secret.serialize()),
            identity_commitment: secret.commitment(),
            event_id: event_id.into(),
            session_seed: hex::encode(seed),
            identity_path: None,
        }
    }
}

// ─── IdentityRecord ────────────────────────────────────────────────────

/// Discriminant of an [`IdentityRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    DirectKey,
    Membership,
    CustodyMembership,
    Event,
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DirectKey => "direct_key",
            Self::Membership => "membership",
            Self::CustodyMembership => "custody_membership",
            Self::Event => "event",
        })
    }
}

/// One identity, in any of the four variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentityRecord {
    DirectKey(DirectKeyIdentity),
    Membership(MembershipIdentity),
    CustodyMembership(CustodyMembershipIdentity),
    Event(EventIdentity),
}

impl IdentityRecord {
    /// Parse an untrusted JSON record.
    ///
    /// Unlike plain deserialization, a missing or negative `nonce` and any
    /// shape error surface as [`IdentityError::Validation`].
    pub fn from_json(value: serde_json::Value) -> Result<Self, IdentityError> {
        let obj = value
            .as_object()
            .ok_or_else(|| IdentityError::Validation("identity must be a JSON object".into()))?;
        match obj.get("nonce") {
            None | Some(serde_json::Value::Null) => {
                return Err(IdentityError::Validation("nonce is required".into()))
            }
            Some(n) if n.as_u64().is_none() => {
                return Err(IdentityError::Validation(
                    "nonce must be a non-negative integer".into(),
                ))
            }
            Some(_) => {}
        }
        serde_json::from_value(value).map_err(|e| IdentityError::Validation(e.to_string()))
    }

    pub fn kind(&self) -> IdentityKind {
        match self {
            Self::DirectKey(_) => IdentityKind::DirectKey,
            Self::Membership(_) => IdentityKind::Membership,
            Self::CustodyMembership(_) => IdentityKind::CustodyMembership,
            Self::Event(_) => IdentityKind::Event,
        }
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            Self::DirectKey(i) => i.address.as_deref(),
            Self::Membership(i) => i.address.as_deref(),
            Self::CustodyMembership(i) => i.address.as_deref(),
            Self::Event(i) => i.address.as_deref(),
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            Self::DirectKey(i) => i.nonce,
            Self::Membership(i) => i.nonce,
            Self::CustodyMembership(i) => i.nonce,
            Self::Event(i) => i.nonce,
        }
    }

    /// Identity commitment, for the three membership-style variants.
    pub fn commitment(&self) -> Option<&IdentityCommitment> {
        match self {
            Self::DirectKey(_) => None,
            Self::Membership(i) => Some(&i.identity_commitment),
            Self::CustodyMembership(i) => Some(&i.identity_commitment),
            Self::Event(i) => Some(&i.identity_commitment),
        }
    }

    /// Group this identity claims membership in.
    pub fn group(&self) -> Option<GroupRef> {
        match self {
            Self::DirectKey(_) => None,
            Self::Membership(i) => Some(GroupRef::reputation(&i.provider, &i.reputation_tier)),
            Self::CustodyMembership(i) => {
                Some(GroupRef::reputation(&i.provider, &i.reputation_tier))
            }
            Self::Event(i) => Some(GroupRef::Event {
                event_id: i.event_id.clone(),
            }),
        }
    }

    /// Cached Merkle path, if any.
    pub fn identity_path(&self) -> Option<&MerklePath> {
        match self {
            Self::DirectKey(_) => None,
            Self::Membership(i) => i.identity_path.as_ref(),
            Self::CustodyMembership(i) => i.identity_path.as_ref(),
            Self::Event(i) => i.identity_path.as_ref(),
        }
    }

    /// Replace the cached Merkle path. No-op for direct-key identities.
    pub fn set_identity_path(&mut self, path: Option<MerklePath>) {
        match self {
            Self::DirectKey(_) => {}
            Self::Membership(i) => i.identity_path = path,
            Self::CustodyMembership(i) => i.identity_path = path,
            Self::Event(i) => i.identity_path = path,
        }
    }

    /// Change the reputation group of a membership identity and drop the
    /// cached path, which belonged to the old group.
    pub fn set_reputation_group(
        &mut self,
        provider: impl Into<String>,
        tier: impl Into<String>,
    ) -> Result<(), IdentityError> {
        let (p, t, path) = match self {
            Self::Membership(i) => (&mut i.provider, &mut i.reputation_tier, &mut i.identity_path),
            Self::CustodyMembership(i) => {
                (&mut i.provider, &mut i.reputation_tier, &mut i.identity_path)
            }
            other => {
                return Err(IdentityError::Validation(format!(
                    "{} identities have no reputation group",
                    other.kind()
                )))
            }
        };
        *p = provider.into();
        *t = tier.into();
        *path = None;
        Ok(())
    }

    /// Copy with every secret field emptied.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            Self::DirectKey(i) => i.private_key = SecretString::empty(),
            Self::Membership(i) => i.serialized_secret = SecretString::empty(),
            Self::CustodyMembership(_) => {}
            Self::Event(i) => i.serialized_secret = SecretString::empty(),
        }
        copy
    }

    /// The key this identity is selected and looked up by.
    pub fn reference(&self) -> IdentityRef {
        match self {
            Self::DirectKey(i) => IdentityRef::PublicKey(i.public_key.clone()),
            Self::Membership(i) => IdentityRef::Commitment(i.identity_commitment),
            Self::CustodyMembership(i) => IdentityRef::Commitment(i.identity_commitment),
            Self::Event(i) => IdentityRef::Commitment(i.identity_commitment),
        }
    }
}

// ─── IdentityRef ───────────────────────────────────────────────────────

/// How callers name an identity: by public key (direct-key) or by
/// commitment (membership variants).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum IdentityRef {
    PublicKey(String),
    Commitment(IdentityCommitment),
}

impl IdentityRef {
    /// Whether `record` is the identity this reference names.
    pub fn matches(&self, record: &IdentityRecord) -> bool {
        *self == record.reference()
    }
}

impl fmt::Display for IdentityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublicKey(pk) => write!(f, "pk:{pk}"),
            Self::Commitment(c) => write!(f, "commitment:{c}"),
        }
    }
}
