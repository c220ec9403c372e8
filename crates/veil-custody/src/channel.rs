//! # Channel Transport
//!
//! A [`CustodyAgent`] over an mpsc request queue with a oneshot reply per
//! call. [`ChannelAgent`] is the client half; the agent process (or an
//! in-process adapter) drives the [`AgentEndpoint`] half.
//!
//! Every request carries a correlation id and the reply must echo it.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;
use veil_core::IdentityCommitment;
use veil_zkp::MembershipProof;

use crate::agent::{AgentProofRequest, CustodyAgent};
use crate::error::CustodyError;

/// A call from the bridge to the agent.
#[derive(Debug, Clone)]
pub enum AgentCall {
    Connect,
    GetActiveIdentity,
    SemaphoreProof(AgentProofRequest),
}

impl AgentCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::GetActiveIdentity => "get_active_identity",
            Self::SemaphoreProof(_) => "semaphore_proof",
        }
    }
}

/// What the agent answers.
#[derive(Debug, Clone)]
pub enum AgentReply {
    Connected,
    ActiveIdentity(Option<IdentityCommitment>),
    Proof(Box<MembershipProof>),
    Rejected(String),
}

/// A call plus its correlation id and reply slot.
#[derive(Debug)]
pub struct AgentRequest {
    pub id: Uuid,
    pub call: AgentCall,
    reply: oneshot::Sender<(Uuid, AgentReply)>,
}

impl AgentRequest {
    /// Answer this request. Returns `false` if the caller has gone away.
    pub fn respond(self, reply: AgentReply) -> bool {
        let id = self.id;
        self.reply.send((id, reply)).is_ok()
    }

    /// Answer with an explicit id. Agents use [`respond`](Self::respond);
    /// this exists to exercise correlation checks.
    pub fn respond_as(self, id: Uuid, reply: AgentReply) -> bool {
        self.reply.send((id, reply)).is_ok()
    }
}

/// Agent side of the channel.
#[derive(Debug)]
pub struct AgentEndpoint {
    rx: mpsc::Receiver<AgentRequest>,
}

impl AgentEndpoint {
    /// Next request, or `None` once every [`ChannelAgent`] is dropped.
    pub async fn recv(&mut self) -> Option<AgentRequest> {
        self.rx.recv().await
    }
}

/// Bridge side of the channel.
#[derive(Debug, Clone)]
pub struct ChannelAgent {
    tx: mpsc::Sender<AgentRequest>,
}

/// Create a connected client/agent pair.
pub fn channel_agent(capacity: usize) -> (ChannelAgent, AgentEndpoint) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelAgent { tx }, AgentEndpoint { rx })
}

impl ChannelAgent {
    async fn call(&self, call: AgentCall) -> Result<AgentReply, CustodyError> {
        let operation = call.name();
        let id = Uuid::new_v4();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(AgentRequest {
                id,
                call,
                reply: reply_tx,
            })
            .await
            .map_err(|_| CustodyError::Disconnected { operation })?;

        let (reply_id, reply) = reply_rx
            .await
            .map_err(|_| CustodyError::Disconnected { operation })?;
        if reply_id != id {
            return Err(CustodyError::InvalidResponse {
                operation,
                reason: format!("correlation id {reply_id} does not match request {id}"),
            });
        }
        match reply {
            AgentReply::Rejected(reason) => Err(CustodyError::Rejected { operation, reason }),
            other => Ok(other),
        }
    }
}

fn unexpected(operation: &'static str, reply: &AgentReply) -> CustodyError {
    CustodyError::InvalidResponse {
        operation,
        reason: format!("unexpected reply {reply:?}"),
    }
}

#[async_trait]
impl CustodyAgent for ChannelAgent {
    async fn connect(&self) -> Result<(), CustodyError> {
        match self.call(AgentCall::Connect).await? {
            AgentReply::Connected => Ok(()),
            other => Err(unexpected("connect", &other)),
        }
    }

    async fn get_active_identity(&self) -> Result<Option<IdentityCommitment>, CustodyError> {
        match self.call(AgentCall::GetActiveIdentity).await? {
            AgentReply::ActiveIdentity(commitment) => Ok(commitment),
            other => Err(unexpected("get_active_identity", &other)),
        }
    }

    async fn semaphore_proof(
        &self,
        request: AgentProofRequest,
    ) -> Result<MembershipProof, CustodyError> {
        match self.call(AgentCall::SemaphoreProof(request)).await? {
            AgentReply::Proof(proof) => Ok(*proof),
            other => Err(unexpected("semaphore_proof", &other)),
        }
    }
}
