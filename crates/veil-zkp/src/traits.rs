//! # Proof System Trait
//!
//! Abstract interface for the membership proving backend. The mock
//! system and any real Groth16 backend satisfy the same trait, so the
//! generator and the submitter never name a concrete backend.
//!
//! The trait is object-safe: callers hold an `Arc<dyn ProofSystem>` and
//! swap backends through configuration, not generics.

use thiserror::Error;

use crate::artifacts::CircuitArtifacts;
use crate::signals::MembershipProof;
use crate::witness::Witness;

/// Error during witness construction or proof generation.
#[derive(Error, Debug)]
pub enum ProofError {
    /// Circuit artifacts are missing or unusable.
    #[error("circuit error: {0}")]
    CircuitError(String),
    /// The inputs cannot form a consistent witness. Raised before the
    /// backend is invoked.
    #[error("witness error: {0}")]
    WitnessError(String),
    /// The backend failed while proving.
    #[error("prover error: {0}")]
    ProverError(String),
}

/// Error during proof verification.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The proof blob is not something this backend understands.
    #[error("invalid proof: {0}")]
    InvalidProof(String),
    /// The proof was produced by a different backend.
    #[error("backend mismatch: expected {expected}, got {actual}")]
    BackendMismatch { expected: String, actual: String },
}

/// A membership proving backend.
pub trait ProofSystem: Send + Sync {
    /// Short backend identifier, recorded inside every proof blob.
    fn name(&self) -> &'static str;

    /// Produce a proof for an already-validated witness.
    ///
    /// CPU-bound; callers run it off the async executor.
    fn prove(
        &self,
        artifacts: &CircuitArtifacts,
        witness: &Witness,
    ) -> Result<MembershipProof, ProofError>;

    /// Check a proof against its own public signals.
    ///
    /// `Ok(false)` means well-formed but not valid. Binding to a specific
    /// message and action is checked by
    /// [`verify_membership`](crate::verify_membership).
    fn verify(&self, proof: &MembershipProof) -> Result<bool, VerifyError>;
}
