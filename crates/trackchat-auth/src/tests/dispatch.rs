//! Credential attachment and the cases that must not trigger a refresh.

use super::harness::TestHarness;
use crate::{AuthError, FailureKind, RefreshState};
use futures::future::join_all;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn valid_credential_is_attached() {
    let h = TestHarness::new();
    h.seed("A1", "R1");
    h.backend.accept("A1");

    let response = h.manager.client().get("/api/greeting/").await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body["served_with"], "A1");
    let sent = h.backend.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].access.as_deref(), Some("A1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_with_valid_credential_never_refresh() {
    let h = TestHarness::new();
    h.seed("A1", "R1");
    h.backend.accept("A1");

    let client = h.manager.client().clone();
    let calls = (0..16).map(|i| {
        let client = client.clone();
        async move {
            client
                .post_json("/api/chat/", json!({ "message": format!("m{}", i) }))
                .await
        }
    });
    let results = join_all(calls).await;

    for (i, result) in results.into_iter().enumerate() {
        let response = result.unwrap();
        assert_eq!(response.body["message"], format!("echo: m{}", i));
    }
    assert_eq!(h.backend.sent_count(), 16);
    assert_eq!(h.backend.refresh_count(), 0);
    assert_eq!(h.manager.coordinator().state(), RefreshState::Idle);
}

#[tokio::test]
async fn call_without_credentials_is_unauthenticated() {
    let h = TestHarness::new();

    let err = h.manager.client().get("/api/greeting/").await.unwrap_err();

    let sent = h.backend.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].access.is_none());
    // no refresh credential: fails without touching the refresh endpoint
    assert_eq!(err.kind(), FailureKind::RefreshFailed);
    assert_eq!(h.backend.refresh_count(), 0);
}

#[tokio::test]
async fn cleared_store_sends_no_authorization() {
    let h = TestHarness::new();
    h.seed("A1", "R1");
    h.backend.accept("A1");
    h.manager.client().get("/api/greeting/").await.unwrap();

    h.store.clear().unwrap();
    assert!(h.store.get().is_none());

    let _ = h.manager.client().get("/api/greeting/").await;
    let sent = h.backend.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].access.as_deref(), Some("A1"));
    assert!(sent[1].access.is_none());
}

#[tokio::test]
async fn non_unauthorized_failure_is_not_retried() {
    let h = TestHarness::new();
    h.seed("A1", "R1");
    h.backend.accept("A1");
    h.backend.fail_path("/api/chat/", 500, "model offline");

    let err = h
        .manager
        .client()
        .post_json("/api/chat/", json!({ "message": "hi" }))
        .await
        .unwrap_err();

    match err {
        AuthError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "model offline");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(h.backend.sent_count(), 1);
    assert_eq!(h.backend.refresh_count(), 0);
    assert!(h.store.get().is_some());
}

#[tokio::test(start_paused = true)]
async fn timeout_is_an_ordinary_failure() {
    let h = TestHarness::new();
    h.seed("A1", "R1");
    h.backend.accept("A1");
    h.backend.slow_path("/api/greeting/", Duration::from_secs(60));

    let err = h.manager.client().get("/api/greeting/").await.unwrap_err();

    assert!(matches!(err, AuthError::Timeout));
    assert_eq!(err.kind(), FailureKind::NetworkOrOther);
    assert_eq!(h.backend.sent_count(), 1);
    assert_eq!(h.backend.refresh_count(), 0);
    assert!(h.navigation_events().is_empty());
}
