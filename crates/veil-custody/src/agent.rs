//! # Custody Agent Capability
//!
//! The agent holds membership secrets out of process and proves on the
//! user's behalf. This side only ever sends public inputs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use veil_core::{IdentityCommitment, MerklePath, MessageDigest};
use veil_zkp::{CircuitArtifacts, MembershipProof};

use crate::error::CustodyError;

/// Where the agent gets the inclusion path from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MerkleContext {
    /// Oracle endpoint the agent queries itself.
    StorageAddress(String),
    /// A path already fetched by this side.
    Proof(MerklePath),
}

/// Public inputs for one delegated proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProofRequest {
    /// Action seed; the agent derives the external nullifier from it.
    pub external_nullifier_seed: String,
    pub signal: MessageDigest,
    pub circuit: CircuitArtifacts,
    pub merkle: MerkleContext,
}

/// Operations a custody agent exposes.
#[async_trait]
pub trait CustodyAgent: Send + Sync {
    /// Establish the session. Agents may prompt the user here.
    async fn connect(&self) -> Result<(), CustodyError>;

    /// The commitment of the identity the agent currently has active.
    async fn get_active_identity(&self) -> Result<Option<IdentityCommitment>, CustodyError>;

    /// Build the witness and prove inside the agent.
    async fn semaphore_proof(
        &self,
        request: AgentProofRequest,
    ) -> Result<MembershipProof, CustodyError>;
}
