//! # External Custody Bridge
//!
//! Same output as the local proof generator, but the secret and the
//! proving work stay with the custody agent. Every call is bounded by the
//! configured timeout, and every failure surfaces as a [`CustodyError`].
//! There is no local fallback.
//!
//! Returned proofs are checked to commit to the requested message and
//! action (and to the supplied root, when a path was supplied) before
//! they are handed back.

use std::future::Future;
use std::sync::Arc;

use veil_core::{IdentityCommitment, MessageDigest};
use veil_zkp::{CircuitArtifacts, MembershipProof};

use crate::agent::{AgentProofRequest, CustodyAgent, MerkleContext};
use crate::config::CustodyConfig;
use crate::error::CustodyError;

/// Front door to an optional custody agent.
#[derive(Clone)]
pub struct CustodyBridge {
    agent: Option<Arc<dyn CustodyAgent>>,
    config: CustodyConfig,
}

impl std::fmt::Debug for CustodyBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustodyBridge")
            .field("installed", &self.agent.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl CustodyBridge {
    pub fn new(agent: Arc<dyn CustodyAgent>, config: CustodyConfig) -> Self {
        Self {
            agent: Some(agent),
            config,
        }
    }

    /// A bridge with no agent installed. Every call fails with
    /// [`CustodyError::NotInstalled`].
    pub fn absent() -> Self {
        Self {
            agent: None,
            config: CustodyConfig::default(),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.agent.is_some()
    }

    fn agent(&self) -> Result<&Arc<dyn CustodyAgent>, CustodyError> {
        self.agent.as_ref().ok_or(CustodyError::NotInstalled)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, CustodyError>>,
    ) -> Result<T, CustodyError> {
        let result = match tokio::time::timeout(self.config.timeout(), fut).await {
            Ok(r) => r,
            Err(_) => Err(CustodyError::Timeout {
                operation,
                after_secs: self.config.timeout_secs,
            }),
        };
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!("veil_custody_requests_total", "operation" => operation, "outcome" => outcome)
            .increment(1);
        if let Err(e) = &result {
            tracing::warn!(operation, error = %e, "custody call failed");
        }
        result
    }

    /// Open the agent session.
    pub async fn connect(&self) -> Result<(), CustodyError> {
        let agent = self.agent()?;
        self.bounded("connect", agent.connect()).await
    }

    /// Ask the agent which identity is active. The only source of the
    /// commitment for a custody-backed identity.
    pub async fn get_active_identity(&self) -> Result<Option<IdentityCommitment>, CustodyError> {
        let agent = self.agent()?;
        self.bounded("get_active_identity", agent.get_active_identity())
            .await
    }

    /// Have the agent prove membership for `digest` under the action
    /// `external_nullifier_seed`.
    pub async fn prove_membership(
        &self,
        external_nullifier_seed: &str,
        digest: &MessageDigest,
        circuit: &CircuitArtifacts,
        merkle: MerkleContext,
    ) -> Result<MembershipProof, CustodyError> {
        let agent = self.agent()?;
        if let MerkleContext::Proof(path) = &merkle {
            path.validate()
                .map_err(|e| CustodyError::Binding(format!("refusing to send malformed path: {e}")))?;
        }
        let expected_root = match &merkle {
            MerkleContext::Proof(path) => Some(path.root),
            MerkleContext::StorageAddress(_) => None,
        };

        let request = AgentProofRequest {
            external_nullifier_seed: external_nullifier_seed.to_string(),
            signal: *digest,
            circuit: circuit.clone(),
            merkle,
        };
        tracing::debug!(seed = external_nullifier_seed, "requesting custody proof");
        let proof = self
            .bounded("semaphore_proof", agent.semaphore_proof(request))
            .await?;

        if !proof.public_signals.binds(digest, external_nullifier_seed) {
            return Err(CustodyError::Binding(
                "signal hash or external nullifier differs from the request".into(),
            ));
        }
        if let Some(root) = expected_root {
            if proof.public_signals.merkle_root != root {
                return Err(CustodyError::Binding(format!(
                    "proof root {} differs from supplied path root {}",
                    proof.public_signals.merkle_root, root
                )));
            }
        }
        Ok(proof)
    }
}
