//! # Vault RPC Protocol
//!
//! Everything that crosses the boundary between the vault task and its
//! callers. Each [`VaultRequest`] carries a correlation id that the
//! matching [`VaultResponse`] echoes back.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;
use veil_core::{IdentityRecord, IdentityRef, SecretString};

use crate::error::VaultError;

/// Operations the vault accepts.
#[derive(Debug)]
pub enum VaultCommand {
    Unlock { passphrase: SecretString },
    Lock,
    AddIdentity { record: IdentityRecord },
    ListIdentities,
    GetByAddress { address: String },
    SelectIdentity { reference: IdentityRef },
    Status,
    RevealPrivateKey { handle: String },
    Sign { public_key: String, payload: Vec<u8> },
}

impl VaultCommand {
    /// Short name for logs. Never includes arguments.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unlock { .. } => "unlock",
            Self::Lock => "lock",
            Self::AddIdentity { .. } => "add_identity",
            Self::ListIdentities => "list_identities",
            Self::GetByAddress { .. } => "get_by_address",
            Self::SelectIdentity { .. } => "select_identity",
            Self::Status => "status",
            Self::RevealPrivateKey { .. } => "reveal_private_key",
            Self::Sign { .. } => "sign",
        }
    }
}

/// Successful results.
#[derive(Debug)]
pub enum VaultReply {
    /// Unlock succeeded after verifying this many stored entries.
    Unlocked { entries: usize },
    Done,
    Identities(Vec<IdentityRecord>),
    Identity(Option<IdentityRecord>),
    Status(VaultStatus),
    Secret(SecretString),
    /// Hex-encoded Ed25519 signature.
    Signature(String),
}

/// A command plus its correlation id and reply slot.
#[derive(Debug)]
pub struct VaultRequest {
    pub id: Uuid,
    pub command: VaultCommand,
    pub(crate) reply: oneshot::Sender<VaultResponse>,
}

/// The answer to one [`VaultRequest`].
#[derive(Debug)]
pub struct VaultResponse {
    pub id: Uuid,
    pub result: Result<VaultReply, VaultError>,
}

/// Snapshot returned by `status()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultStatus {
    pub unlocked: bool,
    /// What the user selected, whether or not the vault stores it.
    pub selected: Option<IdentityRef>,
    /// The selected identity, redacted, when it is a stored Direct-key.
    pub current_identity: Option<IdentityRecord>,
}

/// Change notifications for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    IdentitiesChanged { count: usize },
    Unlocked,
    Locked,
    SelectionChanged(Option<IdentityRef>),
}
