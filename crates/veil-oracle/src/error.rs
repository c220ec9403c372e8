//! Membership oracle error types.

/// Errors from a single oracle call.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The oracle returned a non-2xx status.
    #[error("oracle {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The oracle flagged the request as failed (`error: true`).
    #[error("oracle {endpoint} reported an error: {message}")]
    Service { endpoint: String, message: String },
    /// The response violates the protocol (no data without an error flag,
    /// wrong leaf, bad path shape, undecodable body).
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },
    /// The group cannot be joined through the oracle.
    #[error("group {0} is not joinable")]
    NotJoinable(String),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl OracleError {
    /// Whether a retry could plausibly succeed: transport failures, 5xx
    /// and 429. Protocol violations are not transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { .. } => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Outcomes of [`watch_proof`](crate::watch_proof) other than success.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Every attempt missed.
    #[error("no membership proof after {attempts} attempts")]
    Timeout { attempts: u32 },
    /// The caller cancelled the poll.
    #[error("polling cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
    /// A non-transient oracle failure ended the poll early.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}
