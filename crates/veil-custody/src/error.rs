//! Custody bridge errors.
//!
//! Every variant means "the custody path did not produce a usable result".
//! None of them is a cue to fall back to local proving.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CustodyError {
    /// No agent is installed or configured.
    #[error("custody agent not installed")]
    NotInstalled,

    /// The agent is installed but its channel is gone.
    #[error("custody agent disconnected during {operation}")]
    Disconnected { operation: &'static str },

    /// The agent declined the request (user refused, no active identity).
    #[error("custody agent rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    /// The agent did not answer in time.
    #[error("custody agent timed out after {after_secs}s during {operation}")]
    Timeout {
        operation: &'static str,
        after_secs: u64,
    },

    /// The agent answered with something that does not fit the request.
    #[error("custody agent returned an invalid response to {operation}: {reason}")]
    InvalidResponse {
        operation: &'static str,
        reason: String,
    },

    /// The returned proof does not commit to the requested message or
    /// action.
    #[error("custody proof is not bound to the request: {0}")]
    Binding(String),
}

impl CustodyError {
    /// Whether the agent itself was unreachable or unresponsive, as opposed
    /// to having answered with something unusable.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::NotInstalled | Self::Disconnected { .. } | Self::Timeout { .. } | Self::Rejected { .. }
        )
    }
}
