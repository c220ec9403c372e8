//! Publish collaborator: where finished messages go.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use veil_zkp::ProofSystem;

use crate::message::PublishedMessage;

#[derive(Error, Debug)]
pub enum PublishError {
    /// The store refused the message.
    #[error("message {id} rejected: {reason}")]
    Rejected { id: String, reason: String },
    /// The store could not be reached.
    #[error("message store unavailable: {0}")]
    Unavailable(String),
}

/// The replicated message store, as seen from this subsystem.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn put_message(&self, message: &PublishedMessage) -> Result<(), PublishError>;
    async fn get_message(&self, id: &str) -> Result<Option<PublishedMessage>, PublishError>;
}

/// In-process store. Optionally verifies every message before accepting
/// it, the way a replica would.
#[derive(Clone, Default)]
pub struct MemoryMessageStore {
    messages: Arc<RwLock<HashMap<String, PublishedMessage>>>,
    verifier: Option<Arc<dyn ProofSystem>>,
}

impl std::fmt::Debug for MemoryMessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMessageStore")
            .field("messages", &self.messages.read().len())
            .field("verifying", &self.verifier.is_some())
            .finish()
    }
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects messages failing [`PublishedMessage::verify`].
    pub fn verifying(system: Arc<dyn ProofSystem>) -> Self {
        Self {
            messages: Arc::default(),
            verifier: Some(system),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn put_message(&self, message: &PublishedMessage) -> Result<(), PublishError> {
        if let Some(system) = &self.verifier {
            let verdict = message.verify(system.as_ref());
            match verdict {
                Ok(true) => {}
                Ok(false) => {
                    return Err(PublishError::Rejected {
                        id: message.id.clone(),
                        reason: "authentication does not verify".into(),
                    })
                }
                Err(e) => {
                    return Err(PublishError::Rejected {
                        id: message.id.clone(),
                        reason: e.to_string(),
                    })
                }
            }
        }
        self.messages
            .write()
            .insert(message.id.clone(), message.clone());
        Ok(())
    }

    async fn get_message(&self, id: &str) -> Result<Option<PublishedMessage>, PublishError> {
        Ok(self.messages.read().get(id).cloned())
    }
}
