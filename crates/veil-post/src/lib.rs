//! # veil-post: Anonymous Post Submitter
//!
//! Orchestrates the anonymous-identity subsystem for one post:
//!
//! ```text
//! PostDraft ─▶ Post + digest ─▶ identity variant ─┬─ Direct-key ──▶ vault signs ───────────────┐
//!                                                 ├─ Membership ──▶ oracle path ─▶ local proof ─┤
//!                                                 ├─ Event ───────▶ oracle path ─▶ local proof ─┤
//!                                                 └─ Custody ─────▶ oracle path ─▶ agent proof ─┴─▶ MessageStore
//! ```
//!
//! Also hosts the subsystem's aggregate configuration ([`VeilConfig`]) and
//! tracing bootstrap ([`init_tracing`]).
//!
//! ## Crate Policy
//!
//! - The only crate that depends on every other `veil-*` crate.
//! - Component errors reach the caller unchanged inside [`SubmitError`];
//!   [`ErrorKind`] gives the coarse category.

pub mod config;
pub mod draft;
pub mod error;
pub mod identities;
pub mod message;
pub mod publish;
pub mod state;
pub mod submitter;
pub mod telemetry;

pub use config::{ConfigError, PathRefresh, SubmitOptions, VeilConfig};
pub use draft::{DraftStore, PostDraft};
pub use error::{ErrorKind, SubmitError, SubmitFailure};
pub use identities::IdentityBook;
pub use message::{Authentication, MessageError, Post, PostSubtype, PublishedMessage};
pub use publish::{MemoryMessageStore, MessageStore, PublishError};
pub use state::{StateError, SubmissionFlow, SubmissionState, TransitionRecord};
pub use submitter::{PostSubmitter, Submission};
pub use telemetry::{init_tracing, TelemetryError, TracingConfig};
