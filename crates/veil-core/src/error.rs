//! # Error Types
//!
//! Errors raised while constructing or validating core identity types.
//! Higher layers wrap these in their own error enums.

use thiserror::Error;

/// Errors from identity, secret, and path validation.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// An identity record is missing required fields or carries invalid values.
    #[error("validation error: {0}")]
    Validation(String),

    /// A serialized identity secret could not be parsed.
    #[error("malformed identity secret: {0}")]
    MalformedSecret(String),

    /// A value is not a valid field element (bad hex, too long, or out of range).
    #[error("invalid field element: {0}")]
    InvalidFieldElement(String),

    /// A Merkle inclusion path is structurally inconsistent.
    #[error("malformed Merkle path: {0}")]
    MalformedPath(String),

    /// Direct-key signing or verification failed.
    #[error("signature error: {0}")]
    Signature(String),

    /// Canonicalization of a message failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
