//! Bridge behaviour against a scripted agent served over the channel
//! transport.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use veil_core::{CanonicalBytes, FieldElement, IdentitySecret, MerklePath, MessageDigest};
use veil_custody::{
    channel_agent, AgentCall, AgentEndpoint, AgentReply, CustodyBridge, CustodyConfig,
    CustodyError, MerkleContext,
};
use veil_zkp::{
    verify_membership, CircuitArtifacts, MockProofSystem, ProofSystem, Witness, POST_SEED,
};

#[derive(Clone, Copy)]
enum Behaviour {
    Honest,
    /// Proves over a different message than requested.
    SwapsSignal,
    Refuses,
    /// Holds requests without answering.
    Silent,
}

fn path_for(secret: &IdentitySecret) -> MerklePath {
    MerklePath {
        siblings: vec![FieldElement::from_u64(3), FieldElement::from_u64(4)],
        path_indices: vec![0, 1],
        root: FieldElement::from_u64(77),
        leaf: *secret.commitment().as_field(),
        group: "interrep_github_gold".into(),
    }
}

fn digest(content: &str) -> MessageDigest {
    MessageDigest::of(&CanonicalBytes::new(&json!({"content": content})).unwrap())
}

fn circuit() -> CircuitArtifacts {
    CircuitArtifacts::new(
        "https://circuits.test/s.wasm".parse().unwrap(),
        "https://circuits.test/s.zkey".parse().unwrap(),
    )
}

/// Serve `endpoint` as an agent holding `secret`.
fn spawn_agent(mut endpoint: AgentEndpoint, secret: IdentitySecret, behaviour: Behaviour) {
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Some(req) = endpoint.recv().await {
            if let Behaviour::Silent = behaviour {
                held.push(req);
                continue;
            }
            if let Behaviour::Refuses = behaviour {
                req.respond(AgentReply::Rejected("user declined".into()));
                continue;
            }
            let reply = match &req.call {
                AgentCall::Connect => AgentReply::Connected,
                AgentCall::GetActiveIdentity => AgentReply::ActiveIdentity(Some(secret.commitment())),
                AgentCall::SemaphoreProof(request) => {
                    let path = match &request.merkle {
                        MerkleContext::Proof(p) => p.clone(),
                        MerkleContext::StorageAddress(_) => path_for(&secret),
                    };
                    let signal = match behaviour {
                        Behaviour::SwapsSignal => digest("something else"),
                        _ => request.signal,
                    };
                    let witness =
                        Witness::build(&secret, &path, &request.external_nullifier_seed, &signal)
                            .unwrap();
                    AgentReply::Proof(Box::new(
                        MockProofSystem.prove(&request.circuit, &witness).unwrap(),
                    ))
                }
            };
            req.respond(reply);
        }
    });
}

fn bridge_with(behaviour: Behaviour, secret: &IdentitySecret, timeout_secs: u64) -> CustodyBridge {
    let (agent, endpoint) = channel_agent(8);
    spawn_agent(endpoint, secret.clone(), behaviour);
    CustodyBridge::new(Arc::new(agent), CustodyConfig { timeout_secs })
}

#[tokio::test]
async fn honest_agent_reports_identity_and_proves() {
    let secret = IdentitySecret::generate();
    let bridge = bridge_with(Behaviour::Honest, &secret, 5);

    bridge.connect().await.unwrap();
    let active = bridge.get_active_identity().await.unwrap();
    assert_eq!(active, Some(secret.commitment()));

    let d = digest("hello from custody");
    let proof = bridge
        .prove_membership(POST_SEED, &d, &circuit(), MerkleContext::Proof(path_for(&secret)))
        .await
        .unwrap();
    assert!(verify_membership(&MockProofSystem, &proof, &d, POST_SEED).unwrap());
}

#[tokio::test]
async fn agent_may_fetch_the_path_itself() {
    let secret = IdentitySecret::generate();
    let bridge = bridge_with(Behaviour::Honest, &secret, 5);
    let d = digest("storage address");
    let proof = bridge
        .prove_membership(
            POST_SEED,
            &d,
            &circuit(),
            MerkleContext::StorageAddress("https://api.zkitter.com/v1/proofs".into()),
        )
        .await
        .unwrap();
    assert_eq!(proof.public_signals.merkle_root, FieldElement::from_u64(77));
}

#[tokio::test]
async fn missing_agent_is_unavailable_without_fallback() {
    let bridge = CustodyBridge::absent();
    assert!(!bridge.is_installed());
    let err = bridge
        .prove_membership(POST_SEED, &digest("x"), &circuit(), MerkleContext::StorageAddress(String::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, CustodyError::NotInstalled));
    assert!(err.is_unavailable());
    assert!(matches!(
        bridge.get_active_identity().await,
        Err(CustodyError::NotInstalled)
    ));
}

#[tokio::test]
async fn refusal_is_surfaced() {
    let secret = IdentitySecret::generate();
    let bridge = bridge_with(Behaviour::Refuses, &secret, 5);
    let err = bridge.connect().await.unwrap_err();
    assert!(matches!(err, CustodyError::Rejected { operation: "connect", .. }));
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn proof_over_another_message_is_rejected() {
    let secret = IdentitySecret::generate();
    let bridge = bridge_with(Behaviour::SwapsSignal, &secret, 5);
    let err = bridge
        .prove_membership(POST_SEED, &digest("mine"), &circuit(), MerkleContext::Proof(path_for(&secret)))
        .await
        .unwrap_err();
    assert!(matches!(err, CustodyError::Binding(_)));
    assert!(!err.is_unavailable());
}

#[tokio::test]
async fn malformed_path_is_never_sent() {
    let secret = IdentitySecret::generate();
    let bridge = bridge_with(Behaviour::Honest, &secret, 5);
    let mut path = path_for(&secret);
    path.path_indices = vec![0, 2];
    let err = bridge
        .prove_membership(POST_SEED, &digest("x"), &circuit(), MerkleContext::Proof(path))
        .await
        .unwrap_err();
    assert!(matches!(err, CustodyError::Binding(_)));
}

#[tokio::test(start_paused = true)]
async fn silent_agent_times_out() {
    let secret = IdentitySecret::generate();
    let bridge = bridge_with(Behaviour::Silent, &secret, 60);
    let started = tokio::time::Instant::now();
    let err = bridge.get_active_identity().await.unwrap_err();
    assert!(matches!(
        err,
        CustodyError::Timeout {
            operation: "get_active_identity",
            after_secs: 60
        }
    ));
    assert!(started.elapsed() >= Duration::from_secs(60));
}

#[tokio::test]
async fn agent_going_away_is_disconnected() {
    let (agent, endpoint) = channel_agent(1);
    drop(endpoint);
    let bridge = CustodyBridge::new(Arc::new(agent), CustodyConfig::default());
    let err = bridge.connect().await.unwrap_err();
    assert!(matches!(err, CustodyError::Disconnected { .. }));
    assert!(err.is_unavailable());
}
