//! # Vault Entry Storage
//!
//! A [`VaultEntry`] is the persisted form of a Direct-key identity, keyed by
//! `publicKey` with a secondary lookup by `address`. Only the encrypted
//! private key is stored; the plaintext never reaches a store.
//!
//! Two backends implement [`EntryStore`]:
//!
//! - [`MemoryEntryStore`]: process-local, lost on restart.
//! - [`JsonFileEntryStore`]: one JSON document on disk, rewritten atomically
//!   on every upsert.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// Persisted Direct-key identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultEntry {
    #[serde(default)]
    pub address: Option<String>,
    pub nonce: u64,
    pub public_key: String,
    pub encrypted_private_key: String,
}

/// Storage backend for vault entries.
pub trait EntryStore: Send + Sync {
    /// All entries, ordered by public key.
    fn load_all(&self) -> Result<Vec<VaultEntry>, VaultError>;

    /// Insert or replace the entry with the same `public_key`.
    fn upsert(&self, entry: VaultEntry) -> Result<(), VaultError>;

    fn get(&self, public_key: &str) -> Result<Option<VaultEntry>, VaultError>;

    fn find_by_address(&self, address: &str) -> Result<Option<VaultEntry>, VaultError>;
}

// ─── In-memory ─────────────────────────────────────────────────────────

/// Entries keyed by public key, plus a lower-cased address index. An
/// address held by several entries points at the most recent writer; when
/// that entry moves away the index falls back to another holder.
#[derive(Debug, Default, Clone)]
struct Indexed {
    by_key: BTreeMap<String, VaultEntry>,
    by_address: BTreeMap<String, String>,
}

impl Indexed {
    fn from_entries(entries: Vec<VaultEntry>) -> Self {
        let mut indexed = Self::default();
        for entry in entries {
            indexed.insert(entry);
        }
        indexed
    }

    fn insert(&mut self, entry: VaultEntry) {
        let previous = self
            .by_key
            .insert(entry.public_key.clone(), entry.clone())
            .and_then(|p| p.address)
            .map(|a| a.to_lowercase());
        let current = entry.address.as_deref().map(str::to_lowercase);

        if let Some(old) = previous.filter(|old| Some(old) != current.as_ref()) {
            self.release_address(old, &entry.public_key);
        }
        if let Some(address) = current {
            self.by_address.insert(address, entry.public_key);
        }
    }

    /// `public_key` no longer holds `address`.
    fn release_address(&mut self, address: String, public_key: &str) {
        if self.by_address.get(&address).map(String::as_str) != Some(public_key) {
            return;
        }
        let heir = self
            .by_key
            .values()
            .find(|e| {
                e.address
                    .as_deref()
                    .is_some_and(|a| a.to_lowercase() == address)
            })
            .map(|e| e.public_key.clone());
        match heir {
            Some(pk) => {
                self.by_address.insert(address, pk);
            }
            None => {
                self.by_address.remove(&address);
            }
        }
    }

    fn find_by_address(&self, address: &str) -> Option<VaultEntry> {
        self.by_address
            .get(&address.to_lowercase())
            .and_then(|pk| self.by_key.get(pk))
            .cloned()
    }
}

/// Process-local entry store.
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    inner: RwLock<Indexed>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntryStore for MemoryEntryStore {
    fn load_all(&self) -> Result<Vec<VaultEntry>, VaultError> {
        Ok(self.inner.read().by_key.values().cloned().collect())
    }

    fn upsert(&self, entry: VaultEntry) -> Result<(), VaultError> {
        self.inner.write().insert(entry);
        Ok(())
    }

    fn get(&self, public_key: &str) -> Result<Option<VaultEntry>, VaultError> {
        Ok(self.inner.read().by_key.get(public_key).cloned())
    }

    fn find_by_address(&self, address: &str) -> Result<Option<VaultEntry>, VaultError> {
        Ok(self.inner.read().find_by_address(address))
    }
}

// ─── JSON file ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
struct VaultFile {
    entries: Vec<VaultEntry>,
}

/// Entry store persisted as a single JSON document.
///
/// The file is read once at open and kept in memory; every upsert writes a
/// temporary sibling file and renames it over the original.
#[derive(Debug)]
pub struct JsonFileEntryStore {
    path: PathBuf,
    inner: RwLock<Indexed>,
}

impl JsonFileEntryStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VaultError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => {
                let file: VaultFile = serde_json::from_slice(&bytes).map_err(|e| {
                    VaultError::Storage(format!("{} is not a vault file: {e}", path.display()))
                })?;
                file.entries
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(VaultError::Storage(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "opened vault file");
        Ok(Self {
            path,
            inner: RwLock::new(Indexed::from_entries(entries)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, indexed: &Indexed) -> Result<(), VaultError> {
        let file = VaultFile {
            entries: indexed.by_key.values().cloned().collect(),
        };
        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|e| VaultError::Storage(format!("failed to encode vault file: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)
            .and_then(|()| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                VaultError::Storage(format!("failed to write {}: {e}", self.path.display()))
            })
    }
}

impl EntryStore for JsonFileEntryStore {
    fn load_all(&self) -> Result<Vec<VaultEntry>, VaultError> {
        Ok(self.inner.read().by_key.values().cloned().collect())
    }

    fn upsert(&self, entry: VaultEntry) -> Result<(), VaultError> {
        let mut guard = self.inner.write();
        let mut next = guard.clone();
        next.insert(entry);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn get(&self, public_key: &str) -> Result<Option<VaultEntry>, VaultError> {
        Ok(self.inner.read().by_key.get(public_key).cloned())
    }

    fn find_by_address(&self, address: &str) -> Result<Option<VaultEntry>, VaultError> {
        Ok(self.inner.read().find_by_address(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pk: &str, address: Option<&str>, ct: &str) -> VaultEntry {
        VaultEntry {
            address: address.map(str::to_string),
            nonce: 0,
            public_key: pk.into(),
            encrypted_private_key: ct.into(),
        }
    }

    #[test]
    fn upsert_replaces_by_public_key() {
        let store = MemoryEntryStore::new();
        store.upsert(entry("pub1", Some("0xabc"), "v1:aa")).unwrap();
        store.upsert(entry("pub1", Some("0xabc"), "v1:bb")).unwrap();
        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].encrypted_private_key, "v1:bb");
    }

    #[test]
    fn address_index_follows_updates() {
        let store = MemoryEntryStore::new();
        store.upsert(entry("pub1", Some("0xABC"), "v1:aa")).unwrap();
        assert!(store.find_by_address("0xabc").unwrap().is_some());
        store.upsert(entry("pub1", Some("0xdef"), "v1:aa")).unwrap();
        assert!(store.find_by_address("0xabc").unwrap().is_none());
        assert_eq!(
            store.find_by_address("0xdef").unwrap().unwrap().public_key,
            "pub1"
        );
    }

    #[test]
    fn shared_address_stays_reachable_when_one_holder_moves() {
        let store = MemoryEntryStore::new();
        store.upsert(entry("pub1", Some("0xaaa"), "v1:aa")).unwrap();
        store.upsert(entry("pub2", Some("0xAAA"), "v1:bb")).unwrap();
        assert_eq!(
            store.find_by_address("0xaaa").unwrap().unwrap().public_key,
            "pub2"
        );

        store.upsert(entry("pub1", Some("0xbbb"), "v1:aa")).unwrap();
        assert_eq!(
            store.find_by_address("0xaaa").unwrap().unwrap().public_key,
            "pub2"
        );

        store.upsert(entry("pub2", None, "v1:bb")).unwrap();
        assert!(store.find_by_address("0xaaa").unwrap().is_none());
        assert_eq!(
            store.find_by_address("0xbbb").unwrap().unwrap().public_key,
            "pub1"
        );
    }

    #[test]
    fn index_falls_back_to_remaining_holder() {
        let store = MemoryEntryStore::new();
        store.upsert(entry("pub1", Some("0xaaa"), "v1:aa")).unwrap();
        store.upsert(entry("pub2", Some("0xaaa"), "v1:bb")).unwrap();
        store.upsert(entry("pub2", Some("0xccc"), "v1:bb")).unwrap();
        assert_eq!(
            store.find_by_address("0xaaa").unwrap().unwrap().public_key,
            "pub1"
        );
    }

    #[test]
    fn case_only_change_keeps_the_address() {
        let store = MemoryEntryStore::new();
        store.upsert(entry("pub1", Some("0xabc"), "v1:aa")).unwrap();
        store.upsert(entry("pub1", Some("0xABC"), "v1:aa")).unwrap();
        assert_eq!(
            store.find_by_address("0xAbC").unwrap().unwrap().address.as_deref(),
            Some("0xABC")
        );
    }

    #[test]
    fn json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        {
            let store = JsonFileEntryStore::open(&path).unwrap();
            assert!(store.load_all().unwrap().is_empty());
            store.upsert(entry("pub1", Some("0xabc"), "v1:aa")).unwrap();
            store.upsert(entry("pub2", None, "v1:bb")).unwrap();
        }
        let reopened = JsonFileEntryStore::open(&path).unwrap();
        assert_eq!(reopened.load_all().unwrap().len(), 2);
        assert_eq!(
            reopened.find_by_address("0xabc").unwrap().unwrap().public_key,
            "pub1"
        );
        assert!(reopened.get("pub2").unwrap().is_some());
    }

    #[test]
    fn json_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            JsonFileEntryStore::open(&path),
            Err(VaultError::Storage(_))
        ));
    }
}
