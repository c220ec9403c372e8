//! # veil-vault: Encrypted Identity Vault
//!
//! Holds Direct-key identities with their private keys encrypted under a
//! user passphrase. The vault lives in its own task and is reachable only
//! through [`VaultHandle`], a request/response channel with correlation
//! ids, so secret material never shares state with the UI layer.
//!
//! ## Lock Discipline
//!
//! - `unlock` verifies the passphrase against every stored entry before
//!   adopting it. One failure leaves the vault locked.
//! - `add_identity` requires an unlocked vault.
//! - `list_identities`, `get_by_address`, `select_identity` and `status`
//!   work while locked and never return plaintext or at-rest ciphertext.
//! - The passphrase lives in memory only. Lose it and the Direct-key
//!   identities are gone for good; surface that to users before they set
//!   one.

pub mod config;
pub mod crypto;
pub mod error;
pub mod protocol;
pub mod service;
pub mod store;

pub use config::{KdfParams, VaultConfig, VaultConfigError};
pub use error::VaultError;
pub use protocol::{VaultCommand, VaultEvent, VaultReply, VaultStatus};
pub use service::{VaultHandle, VaultService};
pub use store::{EntryStore, JsonFileEntryStore, MemoryEntryStore, VaultEntry};
