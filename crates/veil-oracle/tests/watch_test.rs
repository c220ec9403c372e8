//! Polling behaviour against a scripted in-process oracle.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use veil_core::{FieldElement, GroupRef, IdentityCommitment, MerklePath};
use veil_oracle::{
    watch_proof, CancelToken, JoinOutcome, MembershipOracle, OracleError, ProofKind, WatchError,
    WatchPolicy,
};

/// Returns `None` (or a transport-like failure) for the first `misses`
/// calls, then a path.
struct ScriptedOracle {
    misses: u32,
    fail_with_503: bool,
    calls: AtomicU32,
}

impl ScriptedOracle {
    fn new(misses: u32) -> Self {
        Self {
            misses,
            fail_with_503: false,
            calls: AtomicU32::new(0),
        }
    }

    fn flaky(misses: u32) -> Self {
        Self {
            fail_with_503: true,
            ..Self::new(misses)
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MembershipOracle for ScriptedOracle {
    async fn find_proof(
        &self,
        group_id: &str,
        commitment: &IdentityCommitment,
        _kind: ProofKind,
    ) -> Result<Option<MerklePath>, OracleError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.misses {
            if self.fail_with_503 {
                return Err(OracleError::Api {
                    endpoint: "GET /v1/proofs".into(),
                    status: 503,
                    body: String::new(),
                });
            }
            return Ok(None);
        }
        Ok(Some(MerklePath {
            siblings: vec![FieldElement::from_u64(1)],
            path_indices: vec![0],
            root: FieldElement::from_u64(2),
            leaf: *commitment.as_field(),
            group: group_id.to_string(),
        }))
    }

    async fn request_join(
        &self,
        _group: &GroupRef,
        _commitment: &IdentityCommitment,
    ) -> Result<JoinOutcome, OracleError> {
        Ok(JoinOutcome::Requested)
    }
}

fn commitment() -> IdentityCommitment {
    IdentityCommitment::from_hex("0x2a").unwrap()
}

fn fast(max_attempts: u32) -> WatchPolicy {
    WatchPolicy {
        max_attempts,
        interval: Duration::from_millis(1),
    }
}

#[tokio::test]
async fn returns_path_on_call_n_plus_one() {
    for n in [0, 1, 5, 11] {
        let oracle = ScriptedOracle::new(n);
        let path = watch_proof(
            &oracle,
            "g",
            &commitment(),
            ProofKind::Semaphore,
            &fast(12),
            &CancelToken::never(),
        )
        .await
        .unwrap();
        assert_eq!(path.group, "g");
        assert_eq!(oracle.calls(), n + 1);
    }
}

#[tokio::test]
async fn times_out_after_exactly_max_attempts() {
    let oracle = ScriptedOracle::new(u32::MAX);
    let err = watch_proof(
        &oracle,
        "g",
        &commitment(),
        ProofKind::Semaphore,
        &fast(7),
        &CancelToken::never(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, WatchError::Timeout { attempts: 7 }));
    assert_eq!(oracle.calls(), 7);
}

#[tokio::test]
async fn transient_failures_count_as_misses() {
    let oracle = ScriptedOracle::flaky(3);
    watch_proof(
        &oracle,
        "g",
        &commitment(),
        ProofKind::Semaphore,
        &fast(4),
        &CancelToken::never(),
    )
    .await
    .unwrap();
    assert_eq!(oracle.calls(), 4);

    let always_down = ScriptedOracle::flaky(u32::MAX);
    let err = watch_proof(
        &always_down,
        "g",
        &commitment(),
        ProofKind::Semaphore,
        &fast(3),
        &CancelToken::never(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, WatchError::Timeout { attempts: 3 }));
    assert_eq!(always_down.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn default_policy_spans_a_minute_of_virtual_time() {
    let oracle = ScriptedOracle::new(u32::MAX);
    let started = tokio::time::Instant::now();
    let err = watch_proof(
        &oracle,
        "g",
        &commitment(),
        ProofKind::Semaphore,
        &WatchPolicy::default(),
        &CancelToken::never(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, WatchError::Timeout { attempts: 12 }));
    // Eleven sleeps between twelve attempts; none after the last.
    assert_eq!(started.elapsed(), Duration::from_secs(55));
}

#[tokio::test(start_paused = true)]
async fn cancellation_is_distinct_from_timeout() {
    let oracle = ScriptedOracle::new(u32::MAX);
    let (handle, token) = CancelToken::pair();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        handle.cancel();
    });

    let err = watch_proof(
        &oracle,
        "g",
        &commitment(),
        ProofKind::Semaphore,
        &WatchPolicy::default(),
        &token,
    )
    .await
    .unwrap_err();
    // Attempts at t=0, 5 and 10; cancelled while waiting for t=15.
    assert!(matches!(err, WatchError::Cancelled { attempts: 3 }), "got {err:?}");
    assert_eq!(oracle.calls(), 3);
}

#[tokio::test]
async fn already_cancelled_token_makes_no_calls() {
    let oracle = ScriptedOracle::new(0);
    let (handle, token) = CancelToken::pair();
    handle.cancel();
    let err = watch_proof(
        &oracle,
        "g",
        &commitment(),
        ProofKind::Semaphore,
        &fast(3),
        &token,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, WatchError::Cancelled { attempts: 0 }));
    assert_eq!(oracle.calls(), 0);
}
