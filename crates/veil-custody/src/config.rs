//! Custody bridge configuration.

use std::time::Duration;

/// Round-trip limits for agent calls.
#[derive(Debug, Clone)]
pub struct CustodyConfig {
    /// Per-call timeout in seconds. Proving inside the agent dominates.
    pub timeout_secs: u64,
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

impl CustodyConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `VEIL_CUSTODY_TIMEOUT_SECS` (default: 60)
    pub fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = match std::env::var("VEIL_CUSTODY_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("VEIL_CUSTODY_TIMEOUT_SECS".into(), raw))?,
            Err(_) => Self::default().timeout_secs,
        };
        Ok(Self { timeout_secs })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allows_a_minute_for_remote_proving() {
        assert_eq!(CustodyConfig::default().timeout(), Duration::from_secs(60));
    }
}
