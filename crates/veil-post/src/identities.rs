//! Application-state registry for identities the vault does not store:
//! local membership, custody-delegated and event-scoped identities.
//! Also caches their Merkle paths.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use veil_core::{IdentityCommitment, IdentityError, IdentityRecord, MerklePath};

#[derive(Debug, Clone, Default)]
pub struct IdentityBook {
    records: Arc<RwLock<HashMap<IdentityCommitment, IdentityRecord>>>,
}

impl IdentityBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a membership-style identity. Direct-key
    /// identities belong in the vault.
    pub fn insert(&self, record: IdentityRecord) -> Result<IdentityCommitment, IdentityError> {
        let commitment = *record.commitment().ok_or_else(|| {
            IdentityError::Validation(format!(
                "{} identities are kept in the vault",
                record.kind()
            ))
        })?;
        self.records.write().insert(commitment, record);
        Ok(commitment)
    }

    pub fn get(&self, commitment: &IdentityCommitment) -> Option<IdentityRecord> {
        self.records.read().get(commitment).cloned()
    }

    pub fn remove(&self, commitment: &IdentityCommitment) -> Option<IdentityRecord> {
        self.records.write().remove(commitment)
    }

    /// Redacted copies of everything registered.
    pub fn list(&self) -> Vec<IdentityRecord> {
        self.records.read().values().map(|r| r.redacted()).collect()
    }

    /// Cache a freshly fetched path. Returns `false` if the identity is
    /// unknown or the path is for another leaf.
    pub fn cache_path(&self, commitment: &IdentityCommitment, path: MerklePath) -> bool {
        if !path.is_for(commitment) {
            return false;
        }
        match self.records.write().get_mut(commitment) {
            Some(record) => {
                record.set_identity_path(Some(path));
                true
            }
            None => false,
        }
    }

    /// Move an identity to another reputation group, dropping its cached
    /// path.
    pub fn set_reputation_group(
        &self,
        commitment: &IdentityCommitment,
        provider: &str,
        tier: &str,
    ) -> Result<(), IdentityError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(commitment)
            .ok_or_else(|| IdentityError::Validation(format!("unknown identity {commitment}")))?;
        record.set_reputation_group(provider, tier)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
