//! Backoff for join requests.
//!
//! A join is a write the oracle applies asynchronously, so resending it is
//! harmless. Only failures [`OracleError::is_transient`] accepts are
//! retried: a 409 or a malformed reply ends the attempt immediately.
//! Lookups are never retried here; polling has its own attempt budget.

use std::future::Future;
use std::time::Duration;

use crate::config::ConfigError;
use crate::error::OracleError;

/// How many times a join is resent and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinRetry {
    /// Resends after the first attempt.
    pub retries: u32,
    /// Delay before the first resend; doubles for each one after it.
    pub base_delay: Duration,
}

impl Default for JoinRetry {
    fn default() -> Self {
        Self {
            retries: 2,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl JoinRetry {
    /// Send once, never resend.
    pub fn none() -> Self {
        Self {
            retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Variables:
    /// - `VEIL_JOIN_RETRIES` (default 2)
    /// - `VEIL_JOIN_RETRY_BASE_MS` (default 250)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let retries = match std::env::var("VEIL_JOIN_RETRIES") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("VEIL_JOIN_RETRIES".into(), raw))?,
            Err(_) => defaults.retries,
        };
        let base_delay = match std::env::var("VEIL_JOIN_RETRY_BASE_MS") {
            Ok(raw) => Duration::from_millis(
                raw.parse()
                    .map_err(|_| ConfigError::InvalidValue("VEIL_JOIN_RETRY_BASE_MS".into(), raw))?,
            ),
            Err(_) => defaults.base_delay,
        };
        Ok(Self {
            retries,
            base_delay,
        })
    }

    /// Wait before resend number `resend` (zero-based).
    fn delay(&self, resend: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(resend.min(16)))
    }

    /// Run `attempt` until it succeeds, fails for good, or the resend
    /// budget is spent. Returns the last error in the latter two cases.
    pub(crate) async fn run<T, F, Fut>(&self, group: &str, attempt: F) -> Result<T, OracleError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        let mut resend = 0;
        loop {
            match attempt().await {
                Err(e) if e.is_transient() && resend < self.retries => {
                    let delay = self.delay(resend);
                    resend += 1;
                    metrics::counter!("veil_oracle_join_retries_total").increment(1);
                    tracing::warn!(
                        %group,
                        resend,
                        retries = self.retries,
                        ?delay,
                        error = %e,
                        "join request failed, resending"
                    );
                    tokio::time::sleep(delay).await;
                }
                outcome => return outcome,
            }
        }
    }
}
