//! # Anonymous Proof Generator
//!
//! [`ProofGenerator::prove_membership`] validates its inputs into a
//! [`Witness`], then runs the backend on the blocking pool so vault and
//! oracle work keep flowing while a proof computes.

use std::sync::Arc;
use std::time::Instant;

use veil_core::{IdentitySecret, MerklePath, MessageDigest};

use crate::artifacts::CircuitArtifacts;
use crate::signals::MembershipProof;
use crate::traits::{ProofError, ProofSystem, VerifyError};
use crate::witness::Witness;

/// Produces membership proofs with a configured backend and circuit.
#[derive(Clone)]
pub struct ProofGenerator {
    system: Arc<dyn ProofSystem>,
    artifacts: CircuitArtifacts,
}

impl std::fmt::Debug for ProofGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofGenerator")
            .field("system", &self.system.name())
            .field("artifacts", &self.artifacts)
            .finish()
    }
}

impl ProofGenerator {
    pub fn new(system: Arc<dyn ProofSystem>, artifacts: CircuitArtifacts) -> Self {
        Self { system, artifacts }
    }

    pub fn system(&self) -> &Arc<dyn ProofSystem> {
        &self.system
    }

    pub fn artifacts(&self) -> &CircuitArtifacts {
        &self.artifacts
    }

    /// Prove that the holder of `secret` is a member of `path`'s group and
    /// signed `digest` under the action `external_nullifier_seed`.
    ///
    /// Fails with [`ProofError::WitnessError`] without invoking the backend
    /// if the inputs are inconsistent.
    pub async fn prove_membership(
        &self,
        secret: &IdentitySecret,
        path: &MerklePath,
        external_nullifier_seed: &str,
        digest: &MessageDigest,
    ) -> Result<MembershipProof, ProofError> {
        let witness = Witness::build(secret, path, external_nullifier_seed, digest)?;

        let system = Arc::clone(&self.system);
        let artifacts = self.artifacts.clone();
        let backend = system.name();
        tracing::debug!(backend, group = %path.group, depth = witness.depth(), "proving membership");

        let started = Instant::now();
        let result = tokio::task::spawn_blocking(move || system.prove(&artifacts, &witness))
            .await
            .map_err(|e| ProofError::ProverError(format!("proving task failed: {e}")))?;
        let elapsed = started.elapsed();
        metrics::histogram!("veil_proof_generation_seconds", "backend" => backend)
            .record(elapsed.as_secs_f64());

        match &result {
            Ok(_) => tracing::info!(backend, elapsed_ms = elapsed.as_millis() as u64, "membership proof ready"),
            Err(e) => tracing::warn!(backend, error = %e, "membership proof failed"),
        }
        result
    }
}

/// Verify `proof` and its binding to `digest` and the action seed.
///
/// A proof whose signals name a different message or action returns
/// `Ok(false)` before the backend is consulted.
pub fn verify_membership(
    system: &dyn ProofSystem,
    proof: &MembershipProof,
    digest: &MessageDigest,
    external_nullifier_seed: &str,
) -> Result<bool, VerifyError> {
    if !proof.public_signals.binds(digest, external_nullifier_seed) {
        tracing::debug!("proof signals do not bind the given message");
        return Ok(false);
    }
    system.verify(proof)
}
