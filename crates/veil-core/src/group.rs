//! # Group References
//!
//! Names the accumulator group an identity claims membership in. Reputation
//! groups are keyed by `(provider, tier)`, e.g. `("twitter", "gold")` for
//! "has 2000+ followers". Event groups are short-lived and keyed by event id.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Protocol segment shared by every reputation group id and join path.
pub const REPUTATION_PROTOCOL: &str = "interrep";

/// Reference to a membership group in the remote accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupRef {
    /// A reputation group granted by a social provider.
    Reputation {
        /// Social provider, e.g. `twitter`, `github`, `reddit`.
        provider: String,
        /// Reputation tier within the provider, e.g. `gold`, `silver`.
        tier: String,
    },
    /// A short-lived event group.
    Event {
        /// Event identifier.
        event_id: String,
    },
}

impl GroupRef {
    /// Convenience constructor for reputation groups.
    pub fn reputation(provider: impl Into<String>, tier: impl Into<String>) -> Self {
        Self::Reputation {
            provider: provider.into(),
            tier: tier.into(),
        }
    }

    /// Group id as understood by the membership oracle.
    pub fn group_id(&self) -> String {
        match self {
            Self::Reputation { provider, tier } => format!(
                "{REPUTATION_PROTOCOL}_{}_{}",
                provider.to_lowercase(),
                tier.to_lowercase()
            ),
            Self::Event { event_id } => format!("event_{event_id}"),
        }
    }

    /// Path segments of the join endpoint
    /// (`interrep`, `groups`, `<provider>`, `<tier>`), or `None` for groups
    /// that cannot be joined through the reputation endpoint. Segments are
    /// raw; the HTTP client percent-encodes each one.
    pub fn join_segments(&self) -> Option<Vec<String>> {
        match self {
            Self::Reputation { provider, tier } => Some(vec![
                REPUTATION_PROTOCOL.to_string(),
                "groups".to_string(),
                provider.to_lowercase(),
                tier.to_lowercase(),
            ]),
            Self::Event { .. } => None,
        }
    }

    /// Whether the oracle accepts join requests for this group.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Reputation { .. })
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.group_id())
    }
}
