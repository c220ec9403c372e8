//! Submission errors and the caller-facing error taxonomy.

use std::fmt;

use thiserror::Error;
use veil_core::{IdentityCommitment, IdentityError, IdentityRef};
use veil_custody::CustodyError;
use veil_oracle::{OracleError, WatchError};
use veil_vault::VaultError;
use veil_zkp::ProofError;

use crate::message::MessageError;
use crate::publish::PublishError;
use crate::state::{StateError, SubmissionState, TransitionRecord};

/// Everything that can stop a submission. Component errors pass through
/// unchanged.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Custody(#[from] CustodyError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    State(#[from] StateError),

    /// The oracle confirmed the identity is not in the group.
    #[error("identity {commitment} is not a member of {group}")]
    NotAMember {
        commitment: IdentityCommitment,
        group: String,
    },

    #[error("unknown identity {0}")]
    UnknownIdentity(IdentityRef),

    #[error("no identity selected")]
    NoIdentitySelected,

    /// The custody agent has a different identity active than the one the
    /// user picked.
    #[error("custody agent's active identity is {active:?}, expected {expected}")]
    CustodyIdentityMismatch {
        expected: IdentityCommitment,
        active: Option<IdentityCommitment>,
    },
}

/// Caller-facing error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    VaultLocked,
    Decryption,
    Validation,
    Oracle,
    Timeout,
    Cancelled,
    Proof,
    CustodyUnavailable,
    NotAMember,
    Publish,
    /// A fault in this subsystem or its storage, not in the user's input.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VaultLocked => "vault_locked",
            Self::Decryption => "decryption",
            Self::Validation => "validation",
            Self::Oracle => "oracle",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Proof => "proof",
            Self::CustodyUnavailable => "custody_unavailable",
            Self::NotAMember => "not_a_member",
            Self::Publish => "publish",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Vault(VaultError::Locked) => ErrorKind::VaultLocked,
            Self::Vault(VaultError::Decryption(_)) => ErrorKind::Decryption,
            Self::Vault(VaultError::Validation(_) | VaultError::NotFound(_)) => {
                ErrorKind::Validation
            }
            Self::Vault(_) => ErrorKind::Internal,
            Self::Oracle(_) => ErrorKind::Oracle,
            Self::Watch(WatchError::Timeout { .. }) => ErrorKind::Timeout,
            Self::Watch(WatchError::Cancelled { .. }) => ErrorKind::Cancelled,
            Self::Watch(WatchError::Oracle(_)) => ErrorKind::Oracle,
            Self::Proof(_) => ErrorKind::Proof,
            Self::Custody(CustodyError::Binding(_)) => ErrorKind::Proof,
            Self::Custody(_) | Self::CustodyIdentityMismatch { .. } => {
                ErrorKind::CustodyUnavailable
            }
            Self::Identity(_)
            | Self::Message(_)
            | Self::UnknownIdentity(_)
            | Self::NoIdentitySelected => ErrorKind::Validation,
            Self::NotAMember { .. } => ErrorKind::NotAMember,
            Self::Publish(_) => ErrorKind::Publish,
            Self::State(_) => ErrorKind::Internal,
        }
    }
}

/// A failed submission: the error, where it stopped, and how it got there.
/// The draft is still in the draft store.
#[derive(Error, Debug)]
#[error("submission failed while {failed_in}: {error}")]
pub struct SubmitFailure {
    #[source]
    pub error: SubmitError,
    pub failed_in: SubmissionState,
    pub transitions: Vec<TransitionRecord>,
}

impl SubmitFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}
