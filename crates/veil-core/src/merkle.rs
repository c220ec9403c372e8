//! # Merkle Inclusion Paths
//!
//! A [`MerklePath`] proves that `leaf` sits in the accumulator tree for
//! `group` with the given `root`. Paths are fetched from the membership
//! oracle, cached on identity records, and refreshed before signing.

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::field::FieldElement;
use crate::secret::IdentityCommitment;

/// Sibling hashes and branch-direction bits for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerklePath {
    /// Sibling at each level, leaf level first.
    pub siblings: Vec<FieldElement>,
    /// Branch direction at each level: 0 = left, 1 = right.
    pub path_indices: Vec<u8>,
    /// Tree root the path resolves to.
    pub root: FieldElement,
    /// The leaf this path is for (an identity commitment).
    pub leaf: FieldElement,
    /// Group id the tree belongs to.
    pub group: String,
}

impl MerklePath {
    /// Structural checks: equal lengths, binary indices, non-empty group.
    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.siblings.len() != self.path_indices.len() {
            return Err(IdentityError::MalformedPath(format!(
                "{} siblings but {} path indices",
                self.siblings.len(),
                self.path_indices.len()
            )));
        }
        if let Some(bad) = self.path_indices.iter().find(|i| **i > 1) {
            return Err(IdentityError::MalformedPath(format!(
                "path index {bad} is not 0 or 1"
            )));
        }
        if self.group.is_empty() {
            return Err(IdentityError::MalformedPath("group is empty".to_string()));
        }
        Ok(())
    }

    /// Tree depth.
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Whether this path's leaf is `commitment`.
    pub fn is_for(&self, commitment: &IdentityCommitment) -> bool {
        self.leaf == *commitment.as_field()
    }
}
