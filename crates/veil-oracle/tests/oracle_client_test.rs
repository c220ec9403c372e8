//! Contract tests for OracleClient against a wiremock indexer.
//!
//! ## Endpoints Tested
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | GET    | `/v1/proofs/{commitment}` | `find_proof_*` |
//! | POST   | `/interrep/groups/{provider}/{tier}/{commitment}` | `request_join_*` |

use serde_json::json;
use veil_core::{GroupRef, IdentityCommitment};
use veil_oracle::{
    CancelToken, JoinOutcome, JoinRetry, OracleClient, OracleConfig, OracleError, ProofKind,
    WatchError, WatchPolicy,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> OracleClient {
    OracleClient::new(OracleConfig::local_mock(&server.uri()).unwrap()).unwrap()
}

fn deadbeef() -> IdentityCommitment {
    IdentityCommitment::from_hex("deadbeef").unwrap()
}

fn proof_path() -> String {
    format!("/v1/proofs/{}", deadbeef().to_hex())
}

fn path_body(group: &str) -> serde_json::Value {
    json!({
        "payload": {"data": {
            "siblings": ["0x0a", "0x0b", "0x0c"],
            "pathIndices": [1, 0, 1],
            "root": "0x1234",
            "leaf": "0xdeadbeef",
            "group": group
        }},
        "error": false
    })
}

// ── GET /v1/proofs/{commitment} ──────────────────────────────────────

#[tokio::test]
async fn find_proof_sends_group_and_kind_and_returns_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(proof_path()))
        .and(query_param("group", "interrep_twitter_gold"))
        .and(query_param("proofType", "semaphore"))
        .respond_with(ResponseTemplate::new(200).set_body_json(path_body("interrep_twitter_gold")))
        .expect(1)
        .mount(&server)
        .await;

    let group = GroupRef::reputation("twitter", "gold").group_id();
    let path = client(&server)
        .find_proof(&group, &deadbeef(), ProofKind::Semaphore)
        .await
        .unwrap()
        .expect("member");
    assert_eq!(path.depth(), 3);
    assert_eq!(path.path_indices, vec![1, 0, 1]);
    assert_eq!(path.group, "interrep_twitter_gold");
    assert!(path.is_for(&deadbeef()));
}

#[tokio::test]
async fn find_proof_null_data_without_error_raises() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(proof_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"payload": {"data": null}, "error": false})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .find_proof("groupA", &deadbeef(), ProofKind::Semaphore)
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::Malformed { .. }), "got {err:?}");
}

#[tokio::test]
async fn find_proof_404_is_confirmed_non_member() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(proof_path()))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = client(&server)
        .find_proof("groupA", &deadbeef(), ProofKind::Rln)
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn find_proof_error_flag_is_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(proof_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"payload": "unknown group", "error": true})),
        )
        .mount(&server)
        .await;

    match client(&server)
        .find_proof("groupA", &deadbeef(), ProofKind::Semaphore)
        .await
    {
        Err(OracleError::Service { message, .. }) => assert_eq!(message, "unknown group"),
        other => panic!("expected Service error, got {other:?}"),
    }
}

#[tokio::test]
async fn find_proof_500_is_transient_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(proof_path()))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = client(&server)
        .find_proof("groupA", &deadbeef(), ProofKind::Semaphore)
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert!(matches!(err, OracleError::Api { status: 503, .. }));
}

#[tokio::test]
async fn find_proof_rejects_path_for_another_group() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(proof_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(path_body("interrep_github_gold")))
        .mount(&server)
        .await;

    let err = client(&server)
        .find_proof("interrep_twitter_gold", &deadbeef(), ProofKind::Semaphore)
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::Malformed { .. }));
}

#[tokio::test]
async fn find_proof_transport_failure_is_http_error() {
    let config = OracleConfig {
        indexer_url: "http://127.0.0.1:1".parse().unwrap(),
        timeout_secs: 1,
        join_retry: JoinRetry::none(),
    };
    let err = OracleClient::new(config)
        .unwrap()
        .find_proof("groupA", &deadbeef(), ProofKind::Semaphore)
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::Http { .. }));
}

// ── POST /interrep/groups/{provider}/{tier}/{commitment} ─────────────

#[tokio::test]
async fn request_join_posts_to_group_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/interrep/groups/twitter/gold/{}",
            deadbeef().to_hex()
        )))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server)
        .request_join(&GroupRef::reputation("twitter", "gold"), &deadbeef())
        .await
        .unwrap();
    assert_eq!(outcome, JoinOutcome::Requested);
}

#[tokio::test]
async fn request_join_conflict_means_already_member() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let outcome = client(&server)
        .request_join(&GroupRef::reputation("github", "silver"), &deadbeef())
        .await
        .unwrap();
    assert_eq!(outcome, JoinOutcome::AlreadyMember);
}

#[tokio::test]
async fn request_join_resends_after_outage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server)
        .request_join(&GroupRef::reputation("twitter", "gold"), &deadbeef())
        .await
        .unwrap();
    assert_eq!(outcome, JoinOutcome::Requested);
}

#[tokio::test]
async fn request_join_does_not_resend_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad commitment"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .request_join(&GroupRef::reputation("twitter", "gold"), &deadbeef())
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::Api { status: 400, .. }));
}

#[tokio::test]
async fn request_join_encodes_group_segments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/interrep/groups/git%2Fhub/gold%3Fx=1/{}",
            deadbeef().to_hex()
        )))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server)
        .request_join(&GroupRef::reputation("git/hub", "gold?x=1"), &deadbeef())
        .await
        .unwrap();
    assert_eq!(outcome, JoinOutcome::Requested);
}

#[tokio::test]
async fn request_join_rejects_event_groups() {
    let server = MockServer::start().await;
    let err = client(&server)
        .request_join(
            &GroupRef::Event {
                event_id: "devcon".into(),
            },
            &deadbeef(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::NotJoinable(_)));
}

// ── Polling over HTTP ────────────────────────────────────────────────

#[tokio::test]
async fn watch_proof_picks_up_membership_after_join() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(proof_path()))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(proof_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(path_body("groupA")))
        .mount(&server)
        .await;

    let policy = WatchPolicy {
        max_attempts: 5,
        interval: std::time::Duration::from_millis(10),
    };
    let path = client(&server)
        .watch_proof(
            "groupA",
            &deadbeef(),
            ProofKind::Semaphore,
            &policy,
            &CancelToken::never(),
        )
        .await
        .unwrap();
    assert_eq!(path.group, "groupA");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn watch_proof_stops_on_protocol_violation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"payload": {"data": null}, "error": false})),
        )
        .mount(&server)
        .await;

    let policy = WatchPolicy {
        max_attempts: 5,
        interval: std::time::Duration::from_millis(10),
    };
    let err = client(&server)
        .watch_proof(
            "groupA",
            &deadbeef(),
            ProofKind::Semaphore,
            &policy,
            &CancelToken::never(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WatchError::Oracle(OracleError::Malformed { .. })));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
