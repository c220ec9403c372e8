//! # veil-core: Foundational Types for the Anonymous-Identity Subsystem
//!
//! Every other `veil-*` crate depends on this one; it depends on nothing
//! internal.
//!
//! ## Key Design Principles
//!
//! 1. **One sum type for identities.** [`IdentityRecord`] has exactly four
//!    variants (Direct-key, Local membership, Custody-delegated membership,
//!    Event-scoped). Proof-path selection matches on it exhaustively, so a
//!    new variant is a compile error everywhere it matters.
//!
//! 2. **Secrets never print.** [`SecretString`] and [`IdentitySecret`] have
//!    redacted `Debug` output and are zeroized on drop.
//!
//! 3. **`CanonicalBytes` for message digests.** A post's digest is computed
//!    over JCS-canonical bytes only, so the same message always binds to
//!    the same proof signal regardless of field order.
//!
//! 4. **Field elements are range-checked.** [`FieldElement`] values are
//!    always below the BN254 scalar modulus used by the membership circuit.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `veil-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod field;
pub mod group;
pub mod identity;
pub mod keys;
pub mod merkle;
pub mod secret;

pub use canonical::CanonicalBytes;
pub use digest::MessageDigest;
pub use error::{CanonicalizationError, IdentityError};
pub use field::{hash_to_field, FieldElement};
pub use group::GroupRef;
pub use identity::{
    CustodyMembershipIdentity, DirectKeyIdentity, EventIdentity, IdentityKind, IdentityRecord,
    IdentityRef, MembershipIdentity, SecretString,
};
pub use keys::{verify_direct_signature, DirectKeyPair};
pub use merkle::MerklePath;
pub use secret::{IdentityCommitment, IdentitySecret};
