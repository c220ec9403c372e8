//! # Submission State Machine
//!
//! ```text
//! Idle ──▶ BuildingMessage ──▶ SelectingProofPath ──▶ AwaitingProof ──▶ Publishing ──▶ Done
//!                                   │      ▲              │                ▲
//!                                   │      └──────────────┘                │
//!                                   │   (stale or missing path)            │
//!                                   └──────── direct-key ──────────────────┘
//!
//! Failed is reachable from every non-terminal state.
//! ```
//!
//! Transitions are validated at runtime and logged with timestamps, so a
//! caller can see exactly where a failed submission stopped.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Where a submission is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    BuildingMessage,
    SelectingProofPath,
    AwaitingProof,
    Publishing,
    Done,
    Failed,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    fn allows(&self, to: SubmissionState) -> bool {
        use SubmissionState::*;
        match (self, to) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Idle, BuildingMessage)
            | (BuildingMessage, SelectingProofPath)
            | (SelectingProofPath, AwaitingProof)
            | (SelectingProofPath, Publishing)
            | (AwaitingProof, SelectingProofPath)
            | (AwaitingProof, Publishing)
            | (Publishing, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "IDLE",
            Self::BuildingMessage => "BUILDING_MESSAGE",
            Self::SelectingProofPath => "SELECTING_PROOF_PATH",
            Self::AwaitingProof => "AWAITING_PROOF",
            Self::Publishing => "PUBLISHING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("invalid submission transition: {from} -> {to}")]
    InvalidTransition {
        from: SubmissionState,
        to: SubmissionState,
    },
}

// ─── Transition Log ──────────────────────────────────────────────────

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from_state: SubmissionState,
    pub to_state: SubmissionState,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// A single submission's state and history.
#[derive(Debug, Clone)]
pub struct SubmissionFlow {
    pub id: Uuid,
    state: SubmissionState,
    transitions: Vec<TransitionRecord>,
}

impl Default for SubmissionFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionFlow {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SubmissionState::Idle,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }

    /// Move to `to`, recording `reason`.
    pub fn advance(&mut self, to: SubmissionState, reason: &str) -> Result<(), StateError> {
        if !self.state.allows(to) {
            return Err(StateError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!(submission = %self.id, from = %self.state, %to, reason, "submission transition");
        self.transitions.push(TransitionRecord {
            from_state: self.state,
            to_state: to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.state = to;
        Ok(())
    }

    /// Move to `Failed` unless already terminal. Returns the state the
    /// submission failed in.
    pub fn fail(&mut self, reason: &str) -> SubmissionState {
        let failed_in = self.state;
        if self.advance(SubmissionState::Failed, reason).is_err() {
            tracing::warn!(submission = %self.id, state = %self.state, "fail() on a terminal submission");
        }
        failed_in
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
