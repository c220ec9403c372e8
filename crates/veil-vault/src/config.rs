//! Vault configuration.
//!
//! Key-derivation cost and the optional on-disk location of the entry
//! store. Defaults follow the Argon2id parameters used for custodial key
//! encryption (64 MiB, 3 passes, 4 lanes).

use std::path::PathBuf;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests. Never use for real secrets.
    pub fn insecure_for_tests() -> Self {
        Self {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Configuration for [`VaultService`](crate::VaultService).
#[derive(Debug, Clone, Default)]
pub struct VaultConfig {
    /// JSON file backing the entry store. In-memory when `None`.
    pub path: Option<PathBuf>,
    pub kdf: KdfParams,
}

impl VaultConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `VEIL_VAULT_PATH` (optional)
    /// - `VEIL_VAULT_KDF_MEMORY_KIB` (default: 65536)
    /// - `VEIL_VAULT_KDF_ITERATIONS` (default: 3)
    /// - `VEIL_VAULT_KDF_PARALLELISM` (default: 4)
    pub fn from_env() -> Result<Self, VaultConfigError> {
        let defaults = KdfParams::default();
        Ok(Self {
            path: std::env::var_os("VEIL_VAULT_PATH").map(PathBuf::from),
            kdf: KdfParams {
                memory_kib: env_u32("VEIL_VAULT_KDF_MEMORY_KIB", defaults.memory_kib)?,
                iterations: env_u32("VEIL_VAULT_KDF_ITERATIONS", defaults.iterations)?,
                parallelism: env_u32("VEIL_VAULT_KDF_PARALLELISM", defaults.parallelism)?,
            },
        })
    }
}

fn env_u32(var: &str, default: u32) -> Result<u32, VaultConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| VaultConfigError::InvalidNumber(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum VaultConfigError {
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),
}
