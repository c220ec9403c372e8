//! Aggregate configuration for the whole subsystem.

use veil_custody::CustodyConfig;
use veil_oracle::{OracleConfig, ProofKind, WatchPolicy};
use veil_vault::VaultConfig;
use veil_zkp::{CircuitArtifacts, POST_SEED};

use crate::telemetry::TracingConfig;

/// When a cached Merkle path may be reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PathRefresh {
    /// Fetch a fresh path before every post. The tree may have moved.
    #[default]
    EveryPost,
    /// Reuse the cached path when it is for this identity and group.
    WhenStale,
}

/// Submission behaviour.
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub proof_kind: ProofKind,
    pub path_refresh: PathRefresh,
    /// Action seed for posts.
    pub action_seed: String,
    /// Polling policy for join-and-wait.
    pub watch: WatchPolicy,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            proof_kind: ProofKind::Semaphore,
            path_refresh: PathRefresh::EveryPost,
            action_seed: POST_SEED.to_string(),
            watch: WatchPolicy::default(),
        }
    }
}

impl SubmitOptions {
    /// Variables:
    /// - `VEIL_PROOF_KIND` (`semaphore` or `rln`, default `semaphore`)
    /// - `VEIL_PATH_REFRESH` (`every_post` or `when_stale`, default `every_post`)
    /// - `VEIL_WATCH_MAX_ATTEMPTS`, `VEIL_WATCH_INTERVAL_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let proof_kind = match std::env::var("VEIL_PROOF_KIND").as_deref() {
            Err(_) | Ok("semaphore") => ProofKind::Semaphore,
            Ok("rln") => ProofKind::Rln,
            Ok(other) => {
                return Err(ConfigError::InvalidValue(
                    "VEIL_PROOF_KIND".into(),
                    other.to_string(),
                ))
            }
        };
        let path_refresh = match std::env::var("VEIL_PATH_REFRESH").as_deref() {
            Err(_) | Ok("every_post") => PathRefresh::EveryPost,
            Ok("when_stale") => PathRefresh::WhenStale,
            Ok(other) => {
                return Err(ConfigError::InvalidValue(
                    "VEIL_PATH_REFRESH".into(),
                    other.to_string(),
                ))
            }
        };
        Ok(Self {
            proof_kind,
            path_refresh,
            action_seed: POST_SEED.to_string(),
            watch: WatchPolicy::from_env()?,
        })
    }
}

/// Every component's configuration.
#[derive(Debug, Clone)]
pub struct VeilConfig {
    pub vault: VaultConfig,
    pub oracle: OracleConfig,
    pub circuit: CircuitArtifacts,
    pub custody: CustodyConfig,
    pub submit: SubmitOptions,
    pub tracing: TracingConfig,
}

impl VeilConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            vault: VaultConfig::from_env()?,
            oracle: OracleConfig::from_env()?,
            circuit: CircuitArtifacts::from_env()?,
            custody: CustodyConfig::from_env()?,
            submit: SubmitOptions::from_env()?,
            tracing: TracingConfig::from_env(),
        })
    }
}

/// Configuration errors, by component.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("vault config: {0}")]
    Vault(#[from] veil_vault::VaultConfigError),
    #[error("oracle config: {0}")]
    Oracle(#[from] veil_oracle::ConfigError),
    #[error("circuit config: {0}")]
    Circuit(#[from] veil_zkp::ArtifactConfigError),
    #[error("custody config: {0}")]
    Custody(#[from] veil_custody::ConfigError),
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_refresh_every_post() {
        let o = SubmitOptions::default();
        assert_eq!(o.path_refresh, PathRefresh::EveryPost);
        assert_eq!(o.action_seed, "POST");
        assert_eq!(o.proof_kind, ProofKind::Semaphore);
    }
}
