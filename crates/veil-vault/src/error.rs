//! Vault error types.

use veil_core::IdentityError;

/// Errors from vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The operation needs an unlocked vault.
    #[error("vault is locked")]
    Locked,

    /// The passphrase does not decrypt the stored entries, or a sealed
    /// handle does not belong to this session.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The identity record is malformed.
    #[error("invalid identity: {0}")]
    Validation(String),

    /// No identity with this key is stored.
    #[error("identity not found: {0}")]
    NotFound(String),

    /// Key derivation or encryption failed for a reason other than a wrong
    /// passphrase.
    #[error("vault crypto error: {0}")]
    Crypto(String),

    /// Reading or writing the entry store failed.
    #[error("vault storage error: {0}")]
    Storage(String),

    /// The vault service has stopped or answered out of protocol.
    #[error("vault service unavailable: {0}")]
    Unavailable(String),
}

impl From<IdentityError> for VaultError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Validation(msg) => Self::Validation(msg),
            other => Self::Validation(other.to_string()),
        }
    }
}
