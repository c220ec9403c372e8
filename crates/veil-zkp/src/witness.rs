//! # Membership Witness
//!
//! A [`Witness`] can only be built through [`Witness::build`], which checks
//! every precondition first. A backend therefore never sees an
//! inconsistent witness; some backends hang on malformed input rather
//! than erroring.

use std::fmt;

use veil_core::{FieldElement, IdentitySecret, MerklePath, MessageDigest};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::signals::{external_nullifier, nullifier_hash, PublicSignals};
use crate::traits::ProofError;

/// Private and public inputs to the membership circuit.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Witness {
    trapdoor: FieldElement,
    nullifier: FieldElement,
    root: FieldElement,
    leaf: FieldElement,
    path_indices: Vec<u8>,
    siblings: Vec<FieldElement>,
    external_nullifier: FieldElement,
    signal: FieldElement,
}

impl Witness {
    /// Assemble a witness, failing fast on any inconsistency.
    ///
    /// Checks, in order: non-empty action seed, path shape, and that the
    /// secret's commitment is the path's leaf.
    pub fn build(
        secret: &IdentitySecret,
        path: &MerklePath,
        external_nullifier_seed: &str,
        digest: &MessageDigest,
    ) -> Result<Self, ProofError> {
        if external_nullifier_seed.is_empty() {
            return Err(ProofError::WitnessError(
                "external nullifier seed is empty".into(),
            ));
        }
        if path.path_indices.len() != path.siblings.len() {
            return Err(ProofError::WitnessError(format!(
                "path has {} indices but {} siblings",
                path.path_indices.len(),
                path.siblings.len()
            )));
        }
        path.validate()
            .map_err(|e| ProofError::WitnessError(e.to_string()))?;

        let commitment = secret.commitment();
        if !path.is_for(&commitment) {
            return Err(ProofError::WitnessError(format!(
                "secret commits to {commitment}, path leaf is {}",
                path.leaf.to_hex()
            )));
        }

        Ok(Self {
            trapdoor: *secret.trapdoor(),
            nullifier: *secret.nullifier(),
            root: path.root,
            leaf: path.leaf,
            path_indices: path.path_indices.clone(),
            siblings: path.siblings.clone(),
            external_nullifier: external_nullifier(external_nullifier_seed),
            signal: digest.to_field(),
        })
    }

    pub fn trapdoor(&self) -> &FieldElement {
        &self.trapdoor
    }

    pub fn nullifier(&self) -> &FieldElement {
        &self.nullifier
    }

    pub fn root(&self) -> &FieldElement {
        &self.root
    }

    pub fn leaf(&self) -> &FieldElement {
        &self.leaf
    }

    pub fn path_indices(&self) -> &[u8] {
        &self.path_indices
    }

    pub fn siblings(&self) -> &[FieldElement] {
        &self.siblings
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// The signals a proof over this witness exposes.
    pub fn public_signals(&self) -> PublicSignals {
        PublicSignals {
            merkle_root: self.root,
            nullifier_hash: nullifier_hash(&self.nullifier, &self.external_nullifier),
            signal_hash: self.signal,
            external_nullifier: self.external_nullifier,
        }
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("root", &self.root)
            .field("leaf", &self.leaf)
            .field("depth", &self.depth())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
