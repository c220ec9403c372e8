//! # Mock Proof System
//!
//! A deterministic, transparent proof system for development and tests.
//! The "proof" is a SHA-256 digest over the canonical public signals and
//! the tree depth. It binds the signals to each other, so tampering with
//! any one of them fails verification, but it offers NO zero-knowledge
//! privacy and anyone can forge it.
//!
//! Must be replaced with a real Groth16 backend before anonymous posts
//! leave a development environment.

use serde_json::json;
use sha2::{Digest, Sha256};
use veil_core::CanonicalBytes;

use crate::artifacts::CircuitArtifacts;
use crate::signals::{MembershipProof, PublicSignals};
use crate::traits::{ProofError, ProofSystem, VerifyError};
use crate::witness::Witness;

const BACKEND: &str = "veil-mock-sha256";

/// Transparent SHA-256 proof system.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockProofSystem;

impl MockProofSystem {
    fn digest(signals: &PublicSignals, depth: usize) -> Result<String, ProofError> {
        let canonical = CanonicalBytes::new(signals)
            .map_err(|e| ProofError::ProverError(format!("canonicalizing signals: {e}")))?;
        let mut hasher = Sha256::new();
        hasher.update(BACKEND.as_bytes());
        hasher.update((depth as u64).to_be_bytes());
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

impl ProofSystem for MockProofSystem {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn prove(
        &self,
        _artifacts: &CircuitArtifacts,
        witness: &Witness,
    ) -> Result<MembershipProof, ProofError> {
        let public_signals = witness.public_signals();
        let digest = Self::digest(&public_signals, witness.depth())?;
        Ok(MembershipProof {
            proof: json!({
                "backend": BACKEND,
                "depth": witness.depth(),
                "digest": digest,
            }),
            public_signals,
        })
    }

    fn verify(&self, proof: &MembershipProof) -> Result<bool, VerifyError> {
        let backend = proof
            .proof
            .get("backend")
            .and_then(|v| v.as_str())
            .ok_or_else(|| VerifyError::InvalidProof("missing backend".into()))?;
        if backend != BACKEND {
            return Err(VerifyError::BackendMismatch {
                expected: BACKEND.into(),
                actual: backend.into(),
            });
        }
        let depth = proof
            .proof
            .get("depth")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| VerifyError::InvalidProof("missing depth".into()))?;
        let claimed = proof
            .proof
            .get("digest")
            .and_then(|v| v.as_str())
            .ok_or_else(|| VerifyError::InvalidProof("missing digest".into()))?;

        let expected = Self::digest(&proof.public_signals, depth as usize)
            .map_err(|e| VerifyError::InvalidProof(e.to_string()))?;
        Ok(claimed == expected)
    }
}
