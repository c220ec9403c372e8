//! # veil-oracle: Membership Oracle Client
//!
//! Looks up Merkle inclusion paths for identity commitments from the
//! remote group accumulator, polls for membership after a join request,
//! and submits join requests.
//!
//! A lookup has three distinct outcomes: a validated path, a confirmed
//! non-member (`Ok(None)`), or an [`OracleError`]. A response with neither
//! data nor an error flag is a protocol violation, never a silent "no".

pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod watch;

pub use client::{JoinOutcome, MembershipOracle, OracleClient, ProofKind};
pub use config::{ConfigError, OracleConfig};
pub use error::{OracleError, WatchError};
pub use retry::JoinRetry;
pub use watch::{watch_proof, CancelHandle, CancelToken, WatchPolicy};
