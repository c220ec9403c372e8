//! # veil-zkp: Anonymous Membership Proofs
//!
//! Proves "a member of this group signed this message" without revealing
//! which member.
//!
//! ## Architecture
//!
//! - **Traits** (`traits.rs`): [`ProofSystem`] is the backend contract.
//!   Mock and real backends are interchangeable behind `Arc<dyn ProofSystem>`.
//!
//! - **Witness** (`witness.rs`): [`Witness::build`] is the only way to make
//!   a witness, and it checks every precondition (secret matches the path
//!   leaf, path shape, action seed) before a backend is touched.
//!
//! - **Signals** (`signals.rs`): [`PublicSignals`], [`MembershipProof`] and
//!   [`external_nullifier`] derivation.
//!
//! - **Generator** (`generator.rs`): [`ProofGenerator`] runs the backend
//!   off the async executor; [`verify_membership`] checks message binding.
//!
//! - **Mock** (`mock.rs`): [`MockProofSystem`], transparent and forgeable,
//!   for development and tests only.
//!
//! ## Crate Policy
//!
//! - Depends on `veil-core` only.
//! - No `unsafe` code.

pub mod artifacts;
pub mod generator;
#[cfg(feature = "mock")]
pub mod mock;
pub mod signals;
pub mod traits;
pub mod witness;

pub use artifacts::{ArtifactConfigError, CircuitArtifacts};
pub use generator::{verify_membership, ProofGenerator};
#[cfg(feature = "mock")]
pub use mock::MockProofSystem;
pub use signals::{external_nullifier, MembershipProof, PublicSignals, POST_SEED};
pub use traits::{ProofError, ProofSystem, VerifyError};
pub use witness::Witness;
