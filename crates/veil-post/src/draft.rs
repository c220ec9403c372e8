//! Drafts being composed, keyed by composer (a reply box, the main editor).
//!
//! A draft outlives a failed submission so the user can retry without
//! retyping; the submitter clears it only after publish succeeds.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::message::{Post, PostSubtype};

/// Unsent post content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    /// Which composer this draft belongs to.
    pub composer: String,
    #[serde(default)]
    pub subtype: PostSubtype,
    pub content: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl PostDraft {
    pub fn new(composer: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            composer: composer.into(),
            subtype: PostSubtype::Default,
            content: content.into(),
            reference: None,
            topic: None,
            title: None,
        }
    }

    pub fn reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.subtype = PostSubtype::Reply;
        self.reference = Some(message_id.into());
        self
    }

    /// Stamp the draft into a post.
    pub fn to_post(&self) -> Post {
        Post {
            subtype: self.subtype,
            content: self.content.clone(),
            reference: self.reference.clone(),
            topic: self.topic.clone(),
            title: self.title.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Shared draft registry.
#[derive(Debug, Clone, Default)]
pub struct DraftStore {
    drafts: Arc<Mutex<HashMap<String, PostDraft>>>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, draft: PostDraft) {
        self.drafts.lock().insert(draft.composer.clone(), draft);
    }

    pub fn get(&self, composer: &str) -> Option<PostDraft> {
        self.drafts.lock().get(composer).cloned()
    }

    /// Remove `composer`'s draft if it still equals `sent`. An edit made
    /// while the submission was in flight survives.
    pub fn clear_if_unchanged(&self, sent: &PostDraft) -> bool {
        let mut drafts = self.drafts.lock();
        if drafts.get(&sent.composer) == Some(sent) {
            drafts.remove(&sent.composer);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.drafts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.lock().is_empty()
    }
}
