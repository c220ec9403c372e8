//! # veil-custody: External Custody Bridge
//!
//! Lets a user keep membership secrets in an external custody agent. The
//! bridge sends only public inputs (action seed, message digest, circuit
//! references, Merkle context) and receives a proof with public signals.
//!
//! [`CustodyAgent`] is the capability; [`ChannelAgent`] implements it over
//! an in-process request/response channel whose other end,
//! [`AgentEndpoint`], is served by the agent. [`CustodyBridge`] adds
//! timeouts, binding checks and metrics on top of any agent.

pub mod agent;
pub mod bridge;
pub mod channel;
pub mod config;
pub mod error;

pub use agent::{AgentProofRequest, CustodyAgent, MerkleContext};
pub use bridge::CustodyBridge;
pub use channel::{channel_agent, AgentCall, AgentEndpoint, AgentReply, AgentRequest, ChannelAgent};
pub use config::{ConfigError, CustodyConfig};
pub use error::CustodyError;
