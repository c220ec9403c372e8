//! Membership oracle client configuration.
//!
//! Defaults point at the production indexer. Override via environment
//! variables or explicit construction for staging and tests.

use url::Url;

use crate::retry::JoinRetry;

/// Configuration for [`OracleClient`](crate::OracleClient).
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Indexer base URL. Default: <https://api.zkitter.com>
    pub indexer_url: Url,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Resend policy for join requests.
    pub join_retry: JoinRetry,
}

impl OracleConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `VEIL_INDEXER_URL` (default: `https://api.zkitter.com`)
    /// - `VEIL_ORACLE_TIMEOUT_SECS` (default: 30)
    /// - `VEIL_JOIN_RETRIES`, `VEIL_JOIN_RETRY_BASE_MS` (see [`JoinRetry::from_env`])
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            indexer_url: env_url("VEIL_INDEXER_URL", "https://api.zkitter.com")?,
            timeout_secs: std::env::var("VEIL_ORACLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            join_retry: JoinRetry::from_env()?,
        })
    }

    /// Point at a local mock server.
    pub fn local_mock(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            indexer_url: Url::parse(base_url)
                .map_err(|e| ConfigError::InvalidUrl("local_mock".to_string(), e.to_string()))?,
            timeout_secs: 5,
            join_retry: JoinRetry {
                retries: 2,
                base_delay: std::time::Duration::from_millis(10),
            },
        })
    }
}

pub(crate) fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
}
