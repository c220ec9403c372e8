//! Circuit artifact locations.
//!
//! The proving backend needs the compiled circuit (wasm) and the proving
//! key (zkey). Both are passed opaquely, either to the local backend or to
//! a custody agent.

use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT_WASM_URL: &str = "https://api.zkitter.com/circuits/semaphore/semaphore.wasm";
const DEFAULT_ZKEY_URL: &str = "https://api.zkitter.com/circuits/semaphore/semaphore_final.zkey";

/// Where to fetch the membership circuit from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitArtifacts {
    pub wasm_url: Url,
    pub zkey_url: Url,
}

impl CircuitArtifacts {
    pub fn new(wasm_url: Url, zkey_url: Url) -> Self {
        Self { wasm_url, zkey_url }
    }

    /// Load from environment variables.
    ///
    /// Variables:
    /// - `VEIL_CIRCUIT_WASM_URL`
    /// - `VEIL_CIRCUIT_ZKEY_URL`
    pub fn from_env() -> Result<Self, ArtifactConfigError> {
        Ok(Self {
            wasm_url: env_url("VEIL_CIRCUIT_WASM_URL", DEFAULT_WASM_URL)?,
            zkey_url: env_url("VEIL_CIRCUIT_ZKEY_URL", DEFAULT_ZKEY_URL)?,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ArtifactConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ArtifactConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Artifact configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
