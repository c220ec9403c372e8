//! # Bounded Membership Polling
//!
//! After a join request the oracle's tree updates asynchronously, so the
//! caller polls for the new path. [`watch_proof`] makes at most
//! `max_attempts` lookups, `interval` apart, and stops at the first hit.
//!
//! A transient failure on one attempt (transport error, 5xx) counts as a
//! miss. A protocol violation ends the poll with [`WatchError::Oracle`].
//! Cancellation through a [`CancelToken`] ends it with
//! [`WatchError::Cancelled`], never with a timeout.

use std::time::Duration;

use tokio::sync::watch;
use veil_core::{IdentityCommitment, MerklePath};

use crate::client::{MembershipOracle, ProofKind};
use crate::config::ConfigError;
use crate::error::WatchError;

/// Attempt budget and spacing for [`watch_proof`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for WatchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            interval: Duration::from_millis(5000),
        }
    }
}

impl WatchPolicy {
    /// Load from environment variables.
    ///
    /// Variables:
    /// - `VEIL_WATCH_MAX_ATTEMPTS` (default: 12)
    /// - `VEIL_WATCH_INTERVAL_MS` (default: 5000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_attempts = match std::env::var("VEIL_WATCH_MAX_ATTEMPTS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("VEIL_WATCH_MAX_ATTEMPTS".into(), raw))?,
            Err(_) => defaults.max_attempts,
        };
        let interval = match std::env::var("VEIL_WATCH_INTERVAL_MS") {
            Ok(raw) => Duration::from_millis(
                raw.parse()
                    .map_err(|_| ConfigError::InvalidValue("VEIL_WATCH_INTERVAL_MS".into(), raw))?,
            ),
            Err(_) => defaults.interval,
        };
        Ok(Self {
            max_attempts,
            interval,
        })
    }
}

// ─── Cancellation ──────────────────────────────────────────────────────

/// Fires a [`CancelToken`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by long-running operations. Cloneable; all clones see the
/// same cancellation.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A handle/token pair.
    pub fn pair() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self::pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Never resolves if the handle is dropped
    /// without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

// ─── Polling ───────────────────────────────────────────────────────────

/// Poll `oracle` until it returns a path, attempts run out, or `cancel`
/// fires.
pub async fn watch_proof<O: MembershipOracle + ?Sized>(
    oracle: &O,
    group_id: &str,
    commitment: &IdentityCommitment,
    kind: ProofKind,
    policy: &WatchPolicy,
    cancel: &CancelToken,
) -> Result<MerklePath, WatchError> {
    let mut cancel = cancel.clone();
    let mut completed = 0u32;

    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(WatchError::Cancelled {
                attempts: completed,
            });
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(WatchError::Cancelled { attempts: completed });
            }
            r = oracle.find_proof(group_id, commitment, kind) => r,
        };
        completed = attempt;
        metrics::counter!("veil_oracle_poll_attempts_total").increment(1);

        match outcome {
            Ok(Some(path)) => {
                tracing::info!(group = %group_id, attempt, "membership path found");
                return Ok(path);
            }
            Ok(None) => {
                tracing::debug!(group = %group_id, attempt, "not a member yet");
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(group = %group_id, attempt, error = %e, "lookup failed, counting as a miss");
            }
            Err(e) => return Err(e.into()),
        }

        if attempt < policy.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(WatchError::Cancelled { attempts: completed });
                }
                _ = tokio::time::sleep(policy.interval) => {}
            }
        }
    }

    tracing::warn!(group = %group_id, attempts = completed, "gave up waiting for membership");
    Err(WatchError::Timeout {
        attempts: completed,
    })
}
