//! Typed client for the membership oracle (group indexer).
//!
//! ## Endpoints
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/v1/proofs/{commitment}?group={group}&proofType={kind}` | Merkle path lookup |
//! | POST   | `/interrep/groups/{provider}/{tier}/{commitment}` | Join request |
//!
//! ## Lookup Responses
//!
//! | Response | Result |
//! |----------|--------|
//! | 404 | `Ok(None)`: confirmed non-member (yet) |
//! | 2xx, `error: true` | `OracleError::Service` |
//! | 2xx, `error: false`, `payload.data` missing or null | `OracleError::Malformed` |
//! | 2xx, path for a different leaf or group, or bad shape | `OracleError::Malformed` |
//! | 2xx, valid path | `Ok(Some(path))` |
//!
//! Field elements on the wire are hex strings, with or without `0x`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;
use veil_core::{FieldElement, GroupRef, IdentityCommitment, MerklePath};

use crate::config::{ConfigError, OracleConfig};
use crate::retry::JoinRetry;
use crate::error::{OracleError, WatchError};
use crate::watch::{watch_proof, CancelToken, WatchPolicy};

/// Which accumulator flavour to query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProofKind {
    #[default]
    Semaphore,
    Rln,
}

impl ProofKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semaphore => "semaphore",
            Self::Rln => "rln",
        }
    }
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The oracle accepted the request; the tree updates asynchronously.
    Requested,
    /// The commitment is already a member.
    AlreadyMember,
}

/// Anything that can answer "is this commitment in this group, and where".
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    /// One lookup. `Ok(None)` means the oracle confirmed the commitment is
    /// not (yet) a member.
    async fn find_proof(
        &self,
        group_id: &str,
        commitment: &IdentityCommitment,
        kind: ProofKind,
    ) -> Result<Option<MerklePath>, OracleError>;

    /// Ask for `commitment` to be added to `group`. Membership shows up in
    /// later lookups once the remote tree updates.
    async fn request_join(
        &self,
        group: &GroupRef,
        commitment: &IdentityCommitment,
    ) -> Result<JoinOutcome, OracleError>;
}

// -- Wire types -----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ProofEnvelope {
    #[serde(default)]
    payload: Option<serde_json::Value>,
    #[serde(default)]
    error: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathData {
    siblings: Vec<FieldElement>,
    path_indices: Vec<u8>,
    root: FieldElement,
    leaf: FieldElement,
    #[serde(default)]
    group: Option<String>,
}

/// Decode and validate a lookup body.
pub(crate) fn decode_proof_response(
    endpoint: &str,
    body: &[u8],
    group_id: &str,
    commitment: &IdentityCommitment,
) -> Result<MerklePath, OracleError> {
    let malformed = |reason: String| OracleError::Malformed {
        endpoint: endpoint.to_string(),
        reason,
    };

    let envelope: ProofEnvelope =
        serde_json::from_slice(body).map_err(|e| malformed(format!("not a proof envelope: {e}")))?;

    if envelope.error {
        let message = match &envelope.payload {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(v) => v
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| v.to_string()),
            None => "no details".to_string(),
        };
        return Err(OracleError::Service {
            endpoint: endpoint.to_string(),
            message,
        });
    }

    let data = envelope
        .payload
        .and_then(|p| match p {
            serde_json::Value::Object(mut map) => map.remove("data"),
            _ => None,
        })
        .filter(|d| !d.is_null())
        .ok_or_else(|| malformed("no data and no error flag".to_string()))?;

    let data: PathData =
        serde_json::from_value(data).map_err(|e| malformed(format!("bad path data: {e}")))?;

    if data.leaf != *commitment.as_field() {
        return Err(malformed(format!(
            "path is for leaf {}, requested {}",
            data.leaf, commitment
        )));
    }
    if let Some(returned) = &data.group {
        if returned != group_id {
            return Err(malformed(format!(
                "path is for group {returned}, requested {group_id}"
            )));
        }
    }

    let path = MerklePath {
        siblings: data.siblings,
        path_indices: data.path_indices,
        root: data.root,
        leaf: data.leaf,
        group: group_id.to_string(),
    };
    path.validate().map_err(|e| malformed(e.to_string()))?;
    Ok(path)
}

// -- Client ---------------------------------------------------------------

/// HTTP client for the membership oracle.
#[derive(Debug, Clone)]
pub struct OracleClient {
    http: reqwest::Client,
    base_url: Url,
    join_retry: JoinRetry,
}

impl OracleClient {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            base_url: config.indexer_url,
            join_retry: config.join_retry,
        })
    }

    /// The indexer URL with `segments` appended, each percent-encoded as a
    /// single path segment.
    fn url<S: AsRef<str>>(&self, segments: &[S]) -> Result<Url, OracleError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ConfigError::InvalidUrl(
                    self.base_url.to_string(),
                    "indexer URL cannot take a path".to_string(),
                )
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Single lookup of the Merkle path for `commitment` in `group`.
    ///
    /// Calls `GET {indexer}/v1/proofs/{commitment}?group={group}&proofType={kind}`.
    pub async fn find_proof(
        &self,
        group_id: &str,
        commitment: &IdentityCommitment,
        kind: ProofKind,
    ) -> Result<Option<MerklePath>, OracleError> {
        let endpoint = format!("GET /v1/proofs/{commitment}");
        let mut url = self.url(&["v1", "proofs", commitment.to_hex().as_str()])?;
        url.query_pairs_mut()
            .append_pair("group", group_id)
            .append_pair("proofType", kind.as_str());

        tracing::debug!(group = %group_id, %commitment, %kind, "looking up membership path");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| OracleError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            metrics::counter!("veil_oracle_lookups_total", "outcome" => "not_member").increment(1);
            return Ok(None);
        }

        if !resp.status().is_success() {
            metrics::counter!("veil_oracle_lookups_total", "outcome" => "error").increment(1);
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Api {
                endpoint,
                status,
                body,
            });
        }

        let body = resp.bytes().await.map_err(|e| OracleError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;
        let decoded = decode_proof_response(&endpoint, &body, group_id, commitment);
        let outcome = if decoded.is_ok() { "member" } else { "error" };
        metrics::counter!("veil_oracle_lookups_total", "outcome" => outcome).increment(1);
        decoded.map(Some)
    }

    /// Ask the oracle to add `commitment` to a reputation group.
    ///
    /// Calls `POST {indexer}/interrep/groups/{provider}/{tier}/{commitment}`.
    /// Event groups are rejected with [`OracleError::NotJoinable`].
    pub async fn request_join(
        &self,
        group: &GroupRef,
        commitment: &IdentityCommitment,
    ) -> Result<JoinOutcome, OracleError> {
        let mut segments = group
            .join_segments()
            .ok_or_else(|| OracleError::NotJoinable(group.group_id()))?;
        segments.push(commitment.to_hex());
        let url = self.url(&segments)?;
        let endpoint = format!("POST {}", url.path());

        tracing::info!(group = %group, %commitment, "requesting group membership");

        self.join_retry
            .run(&group.group_id(), || self.post_join(&endpoint, &url))
            .await
    }

    async fn post_join(&self, endpoint: &str, url: &Url) -> Result<JoinOutcome, OracleError> {
        let resp = self
            .http
            .post(url.clone())
            .send()
            .await
            .map_err(|e| OracleError::Http {
                endpoint: endpoint.to_string(),
                source: e,
            })?;

        if resp.status() == reqwest::StatusCode::CONFLICT {
            return Ok(JoinOutcome::AlreadyMember);
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Api {
                endpoint: endpoint.to_string(),
                status,
                body,
            });
        }
        Ok(JoinOutcome::Requested)
    }

    /// Poll [`find_proof`](Self::find_proof) under `policy`.
    pub async fn watch_proof(
        &self,
        group_id: &str,
        commitment: &IdentityCommitment,
        kind: ProofKind,
        policy: &WatchPolicy,
        cancel: &CancelToken,
    ) -> Result<MerklePath, WatchError> {
        watch_proof(self, group_id, commitment, kind, policy, cancel).await
    }
}

#[async_trait]
impl MembershipOracle for OracleClient {
    async fn find_proof(
        &self,
        group_id: &str,
        commitment: &IdentityCommitment,
        kind: ProofKind,
    ) -> Result<Option<MerklePath>, OracleError> {
        OracleClient::find_proof(self, group_id, commitment, kind).await
    }

    async fn request_join(
        &self,
        group: &GroupRef,
        commitment: &IdentityCommitment,
    ) -> Result<JoinOutcome, OracleError> {
        OracleClient::request_join(self, group, commitment).await
    }
}
