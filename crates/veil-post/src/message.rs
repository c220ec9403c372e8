//! # Messages
//!
//! A [`Post`] is what the user wrote. Its digest over JCS-canonical bytes
//! is the signal a membership proof binds to, and the message id.
//! A [`PublishedMessage`] is the post plus how it was authenticated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use veil_core::{verify_direct_signature, CanonicalBytes, IdentityError, MessageDigest};
use veil_zkp::{verify_membership, MembershipProof, ProofSystem, VerifyError, POST_SEED};

/// Post flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostSubtype {
    #[default]
    Default,
    Reply,
    Repost,
}

#[derive(Error, Debug)]
pub enum MessageError {
    #[error("post content is empty")]
    EmptyContent,
    #[error("{0:?} post needs a reference to another message")]
    MissingReference(PostSubtype),
    #[error("message id {claimed} does not match content digest {actual}")]
    IdMismatch { claimed: String, actual: String },
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// User-authored content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default)]
    pub subtype: PostSubtype,
    pub content: String,
    /// Id of the message replied to or reposted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// A plain post stamped now.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            subtype: PostSubtype::Default,
            content: content.into(),
            reference: None,
            topic: None,
            title: None,
            created_at: Utc::now(),
        }
    }

    /// Reposts may be empty; everything else needs content. Replies and
    /// reposts need a reference.
    pub fn validate(&self) -> Result<(), MessageError> {
        if self.subtype != PostSubtype::Repost && self.content.trim().is_empty() {
            return Err(MessageError::EmptyContent);
        }
        if self.subtype != PostSubtype::Default
            && self.reference.as_deref().map_or(true, str::is_empty)
        {
            return Err(MessageError::MissingReference(self.subtype));
        }
        Ok(())
    }

    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, MessageError> {
        CanonicalBytes::new(self).map_err(|e| MessageError::Identity(e.into()))
    }

    pub fn digest(&self) -> Result<MessageDigest, MessageError> {
        Ok(MessageDigest::of(&self.canonical_bytes()?))
    }
}

/// How a published message proves who (or what kind of member) wrote it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Authentication {
    /// Signed with a vault-held Ed25519 key. Not anonymous.
    #[serde(rename_all = "camelCase")]
    DirectKey {
        public_key: String,
        signature: String,
    },
    /// Proved locally with a membership secret.
    Membership {
        group: String,
        /// Action seed the external nullifier was derived from.
        action: String,
        proof: MembershipProof,
    },
    /// Proved by a custody agent.
    CustodyMembership {
        group: String,
        action: String,
        proof: MembershipProof,
    },
}

impl Authentication {
    pub fn is_anonymous(&self) -> bool {
        !matches!(self, Self::DirectKey { .. })
    }
}

/// A post as handed to the message store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedMessage {
    /// Hex digest of the post.
    pub id: String,
    pub post: Post,
    pub auth: Authentication,
}

impl PublishedMessage {
    pub fn new(post: Post, digest: &MessageDigest, auth: Authentication) -> Self {
        Self {
            id: digest.to_hex(),
            post,
            auth,
        }
    }

    /// Check the id, then the signature or proof (including its binding to
    /// this post and to a post action).
    pub fn verify(&self, system: &dyn ProofSystem) -> Result<bool, MessageError> {
        let digest = self.post.digest()?;
        if digest.to_hex() != self.id {
            return Err(MessageError::IdMismatch {
                claimed: self.id.clone(),
                actual: digest.to_hex(),
            });
        }
        match &self.auth {
            Authentication::DirectKey {
                public_key,
                signature,
            } => {
                let bytes = self.post.canonical_bytes()?;
                Ok(verify_direct_signature(public_key, bytes.as_bytes(), signature).is_ok())
            }
            Authentication::Membership { action, proof, .. }
            | Authentication::CustodyMembership { action, proof, .. } => {
                if !is_post_action(action) {
                    return Ok(false);
                }
                match verify_membership(system, proof, &digest, action) {
                    Ok(valid) => Ok(valid),
                    Err(VerifyError::InvalidProof(_)) | Err(VerifyError::BackendMismatch { .. }) => {
                        Ok(false)
                    }
                }
            }
        }
    }
}

/// `POST`, or `POST:<session seed>` for event-scoped identities.
pub fn is_post_action(action: &str) -> bool {
    action == POST_SEED
        || action
            .strip_prefix(POST_SEED)
            .and_then(|rest| rest.strip_prefix(':'))
            .is_some_and(|seed| !seed.is_empty())
}
