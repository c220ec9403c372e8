//! # Anonymous Post Submitter
//!
//! Builds the message, picks the authentication path from the identity
//! variant, and publishes:
//!
//! | Identity | Path |
//! |----------|------|
//! | Direct-key | vault signs the canonical post; no proof |
//! | Local membership | oracle path, then local proof with the `POST` action |
//! | Event-scoped | oracle path, then local proof with `POST:<session seed>` |
//! | Custody-delegated | oracle path, then the custody agent proves |
//!
//! The draft is saved before anything else and cleared only once the
//! message store accepts the message. Each submission owns its own flow,
//! witness and proof, so concurrent submissions do not interact.

use std::sync::Arc;

use tracing::Instrument;
use veil_core::{
    GroupRef, IdentityCommitment, IdentityRecord, IdentityRef, IdentitySecret, MerklePath,
};
use veil_custody::{CustodyBridge, MerkleContext};
use veil_oracle::{watch_proof, CancelToken, MembershipOracle};
use veil_vault::VaultHandle;
use veil_zkp::ProofGenerator;

use crate::config::{PathRefresh, SubmitOptions};
use crate::draft::{DraftStore, PostDraft};
use crate::error::{SubmitError, SubmitFailure};
use crate::identities::IdentityBook;
use crate::message::{Authentication, PublishedMessage};
use crate::publish::MessageStore;
use crate::state::{SubmissionFlow, SubmissionState, TransitionRecord};

/// A published post and the route it took.
#[derive(Debug, Clone)]
pub struct Submission {
    pub message: PublishedMessage,
    pub transitions: Vec<TransitionRecord>,
}

#[derive(Clone)]
pub struct PostSubmitter {
    vault: VaultHandle,
    oracle: Arc<dyn MembershipOracle>,
    prover: ProofGenerator,
    custody: CustodyBridge,
    store: Arc<dyn MessageStore>,
    identities: IdentityBook,
    drafts: DraftStore,
    options: SubmitOptions,
}

impl std::fmt::Debug for PostSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostSubmitter")
            .field("prover", &self.prover)
            .field("custody", &self.custody)
            .field("identities", &self.identities.len())
            .field("options", &self.options)
            .finish()
    }
}

impl PostSubmitter {
    pub fn new(
        vault: VaultHandle,
        oracle: Arc<dyn MembershipOracle>,
        prover: ProofGenerator,
        custody: CustodyBridge,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            vault,
            oracle,
            prover,
            custody,
            store,
            identities: IdentityBook::new(),
            drafts: DraftStore::new(),
            options: SubmitOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SubmitOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_identity_book(mut self, identities: IdentityBook) -> Self {
        self.identities = identities;
        self
    }

    pub fn with_drafts(mut self, drafts: DraftStore) -> Self {
        self.drafts = drafts;
        self
    }

    pub fn identities(&self) -> &IdentityBook {
        &self.identities
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    /// Publish `draft` as `identity`.
    pub async fn submit_anonymous_post(
        &self,
        draft: PostDraft,
        identity: &IdentityRef,
    ) -> Result<Submission, SubmitFailure> {
        self.submit(draft, Some(identity.clone())).await
    }

    /// Publish `draft` as the identity currently selected in the vault.
    pub async fn submit_as_current(&self, draft: PostDraft) -> Result<Submission, SubmitFailure> {
        self.submit(draft, None).await
    }

    async fn submit(
        &self,
        draft: PostDraft,
        target: Option<IdentityRef>,
    ) -> Result<Submission, SubmitFailure> {
        self.drafts.save(draft.clone());
        let mut flow = SubmissionFlow::new();
        let span = tracing::info_span!("submit_post", submission = %flow.id, composer = %draft.composer);

        let result = self.run(&mut flow, &draft, target).instrument(span).await;
        match result {
            Ok(message) => {
                self.drafts.clear_if_unchanged(&draft);
                metrics::counter!("veil_post_submissions_total", "outcome" => "published")
                    .increment(1);
                tracing::info!(
                    submission = %flow.id,
                    message = %message.id,
                    anonymous = message.auth.is_anonymous(),
                    "post published"
                );
                Ok(Submission {
                    message,
                    transitions: flow.into_transitions(),
                })
            }
            Err(error) => {
                let failed_in = flow.fail(&error.to_string());
                let kind = error.kind();
                metrics::counter!("veil_post_submissions_total", "outcome" => kind.as_str())
                    .increment(1);
                tracing::warn!(submission = %flow.id, %failed_in, %kind, error = %error, "post submission failed");
                Err(SubmitFailure {
                    error,
                    failed_in,
                    transitions: flow.into_transitions(),
                })
            }
        }
    }

    async fn run(
        &self,
        flow: &mut SubmissionFlow,
        draft: &PostDraft,
        target: Option<IdentityRef>,
    ) -> Result<PublishedMessage, SubmitError> {
        flow.advance(SubmissionState::BuildingMessage, "building message")?;
        let post = draft.to_post();
        post.validate()?;
        let digest = post.digest()?;

        flow.advance(SubmissionState::SelectingProofPath, "resolving identity")?;
        let reference = match target {
            Some(r) => r,
            None => self
                .vault
                .status()
                .await?
                .selected
                .ok_or(SubmitError::NoIdentitySelected)?,
        };
        let record = self.resolve(&reference).await?;

        let auth = match &record {
            IdentityRecord::DirectKey(identity) => {
                let payload = post.canonical_bytes()?.as_bytes().to_vec();
                let signature = self
                    .vault
                    .sign(identity.public_key.clone(), payload)
                    .await?;
                flow.advance(SubmissionState::Publishing, "signed with direct key")?;
                Authentication::DirectKey {
                    public_key: identity.public_key.clone(),
                    signature,
                }
            }
            IdentityRecord::Membership(identity) => {
                let group = GroupRef::reputation(&identity.provider, &identity.reputation_tier);
                let action = self.options.action_seed.clone();
                let secret = IdentitySecret::parse(identity.serialized_secret.expose_secret())?;
                flow.advance(SubmissionState::AwaitingProof, "local membership proof")?;
                let path = self
                    .usable_path(flow, &record, &identity.identity_commitment, &group)
                    .await?;
                let proof = self
                    .prover
                    .prove_membership(&secret, &path, &action, &digest)
                    .await?;
                flow.advance(SubmissionState::Publishing, "membership proof ready")?;
                Authentication::Membership {
                    group: group.group_id(),
                    action,
                    proof,
                }
            }
            IdentityRecord::Event(identity) => {
                let group = GroupRef::Event {
                    event_id: identity.event_id.clone(),
                };
                let action = format!("{}:{}", self.options.action_seed, identity.session_seed);
                let secret = IdentitySecret::parse(identity.serialized_secret.expose_secret())?;
                flow.advance(SubmissionState::AwaitingProof, "event membership proof")?;
                let path = self
                    .usable_path(flow, &record, &identity.identity_commitment, &group)
                    .await?;
                let proof = self
                    .prover
                    .prove_membership(&secret, &path, &action, &digest)
                    .await?;
                flow.advance(SubmissionState::Publishing, "event proof ready")?;
                Authentication::Membership {
                    group: group.group_id(),
                    action,
                    proof,
                }
            }
            IdentityRecord::CustodyMembership(identity) => {
                let active = self.custody.get_active_identity().await?;
                if active != Some(identity.identity_commitment) {
                    return Err(SubmitError::CustodyIdentityMismatch {
                        expected: identity.identity_commitment,
                        active,
                    });
                }
                let group = GroupRef::reputation(&identity.provider, &identity.reputation_tier);
                let action = self.options.action_seed.clone();
                flow.advance(SubmissionState::AwaitingProof, "custody proof")?;
                let path = self
                    .usable_path(flow, &record, &identity.identity_commitment, &group)
                    .await?;
                let proof = self
                    .custody
                    .prove_membership(
                        &action,
                        &digest,
                        self.prover.artifacts(),
                        MerkleContext::Proof(path),
                    )
                    .await?;
                flow.advance(SubmissionState::Publishing, "custody proof ready")?;
                Authentication::CustodyMembership {
                    group: group.group_id(),
                    action,
                    proof,
                }
            }
        };

        self.publish(flow, PublishedMessage::new(post, &digest, auth))
            .await
    }

    async fn publish(
        &self,
        flow: &mut SubmissionFlow,
        message: PublishedMessage,
    ) -> Result<PublishedMessage, SubmitError> {
        self.store.put_message(&message).await?;
        flow.advance(SubmissionState::Done, "published")?;
        Ok(message)
    }

    async fn resolve(&self, reference: &IdentityRef) -> Result<IdentityRecord, SubmitError> {
        let found = match reference {
            IdentityRef::PublicKey(_) => self
                .vault
                .list_identities()
                .await?
                .into_iter()
                .find(|r| reference.matches(r)),
            IdentityRef::Commitment(c) => self.identities.get(c),
        };
        found.ok_or_else(|| SubmitError::UnknownIdentity(reference.clone()))
    }

    /// The path to prove against: the cached one when policy allows and it
    /// still fits, otherwise a fresh oracle lookup.
    async fn usable_path(
        &self,
        flow: &mut SubmissionFlow,
        record: &IdentityRecord,
        commitment: &IdentityCommitment,
        group: &GroupRef,
    ) -> Result<MerklePath, SubmitError> {
        let group_id = group.group_id();
        let cached = record
            .identity_path()
            .filter(|p| p.group == group_id && p.is_for(commitment) && p.validate().is_ok());

        let reason = match (self.options.path_refresh, cached) {
            (PathRefresh::WhenStale, Some(path)) => return Ok(path.clone()),
            (PathRefresh::WhenStale, None) if record.identity_path().is_some() => {
                "cached path is stale"
            }
            (PathRefresh::WhenStale, None) => "no cached path",
            (PathRefresh::EveryPost, _) => "refreshing path before signing",
        };
        flow.advance(SubmissionState::SelectingProofPath, reason)?;

        let path = self
            .oracle
            .find_proof(&group_id, commitment, self.options.proof_kind)
            .await?
            .ok_or_else(|| SubmitError::NotAMember {
                commitment: *commitment,
                group: group_id.clone(),
            })?;
        self.identities.cache_path(commitment, path.clone());
        flow.advance(SubmissionState::AwaitingProof, "path fetched")?;
        Ok(path)
    }

    /// Ask the oracle to add a registered identity to its group, then
    /// poll until the path appears. Event groups are only polled.
    pub async fn join_and_wait(
        &self,
        commitment: &IdentityCommitment,
        cancel: &CancelToken,
    ) -> Result<MerklePath, SubmitError> {
        let unknown = || SubmitError::UnknownIdentity(IdentityRef::Commitment(*commitment));
        let record = self.identities.get(commitment).ok_or_else(unknown)?;
        let group = record.group().ok_or_else(unknown)?;

        if group.is_joinable() {
            let outcome = self.oracle.request_join(&group, commitment).await?;
            tracing::info!(group = %group, ?outcome, "join requested");
        }

        let path = watch_proof(
            self.oracle.as_ref(),
            &group.group_id(),
            commitment,
            self.options.proof_kind,
            &self.options.watch,
            cancel,
        )
        .await?;
        self.identities.cache_path(commitment, path.clone());
        Ok(path)
    }
}
