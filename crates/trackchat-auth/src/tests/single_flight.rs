//! One refresh shared by every caller that hits an expired credential.

use super::harness::{wait_until, RefreshScript, TestHarness};
use crate::{AuthState, FailureKind, RefreshState};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_expired_calls_share_one_refresh() {
    let h = Arc::new(TestHarness::new());
    h.seed("A1", "R1");
    h.backend.script_refresh(RefreshScript::grant("A2"));

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let client = h.manager.client().clone();
            tokio::spawn(async move { client.get(&format!("/api/items/{}/", i)).await })
        })
        .collect();

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.body["served_with"], "A2");
    }

    assert_eq!(h.backend.refresh_calls(), vec!["R1".to_string()]);
    assert_eq!(h.store.access_token().as_deref(), Some("A2"));
    assert_eq!(h.manager.status(), AuthState::LoggedIn);
    assert!(h.navigation_events().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn calls_failing_before_refresh_completes_retry_with_same_credential() {
    let h = Arc::new(TestHarness::new());
    h.seed("A1", "R1");
    h.backend.script_refresh(RefreshScript::grant("A2"));
    h.backend.hold_refreshes();

    let first = {
        let client = h.manager.client().clone();
        tokio::spawn(async move { client.get("/api/first/").await })
    };
    let second = {
        let client = h.manager.client().clone();
        tokio::spawn(async move { client.get("/api/second/").await })
    };

    // both rejected with A1 while the refresh is still held
    {
        let h = h.clone();
        wait_until(move || h.backend.sent_count() >= 2 && h.backend.refresh_count() == 1).await;
    }
    assert_eq!(h.manager.status(), AuthState::Refreshing);
    assert_eq!(h.manager.coordinator().state(), RefreshState::Refreshing);

    h.backend.release_refreshes();
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(first.body["served_with"], "A2");
    assert_eq!(second.body["served_with"], "A2");
    assert_eq!(h.backend.refresh_count(), 1);

    let retried: Vec<_> = h
        .backend
        .sent()
        .into_iter()
        .filter(|r| r.access.as_deref() == Some("A2"))
        .map(|r| r.path)
        .collect();
    assert_eq!(retried.len(), 2);
    assert!(retried.contains(&"/api/first/".to_string()));
    assert!(retried.contains(&"/api/second/".to_string()));
}

#[tokio::test]
async fn retried_call_rejected_again_is_not_retried() {
    let h = TestHarness::new();
    h.seed("A1", "R1");
    h.backend.script_refresh(RefreshScript::grant("A2"));
    h.backend.reject_everything();

    let err = h.manager.client().get("/api/greeting/").await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Unauthorized);
    assert_eq!(h.backend.refresh_count(), 1);
    let sent = h.backend.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].access.as_deref(), Some("A1"));
    assert_eq!(sent[1].access.as_deref(), Some("A2"));
    // the refresh itself succeeded, so the session survives
    assert_eq!(h.store.access_token().as_deref(), Some("A2"));
    assert!(h.navigation_events().is_empty());
}

#[tokio::test]
async fn call_rejected_after_refresh_already_happened_reuses_new_credential() {
    let h = TestHarness::new();
    h.seed("A1", "R1");
    h.backend.script_refresh(RefreshScript::grant("A2"));

    h.manager.client().get("/api/one/").await.unwrap();
    assert_eq!(h.backend.refresh_count(), 1);

    // a caller still holding A1 learns about A2 without a second refresh
    let access = h.manager.coordinator().refresh(Some("A1")).await.unwrap();
    assert_eq!(access, "A2");
    assert_eq!(h.backend.refresh_count(), 1);
}

#[tokio::test]
async fn sequential_expiries_refresh_each_time() {
    let h = TestHarness::new();
    h.seed("A1", "R1");
    h.backend.script_refresh(RefreshScript::grant("A2"));
    h.backend.script_refresh(RefreshScript::rotate("A3", "R3"));

    h.manager.client().get("/api/one/").await.unwrap();

    // A2 expires server-side
    h.store.apply_refresh("A2-expired".to_string(), None).unwrap();
    let response = h.manager.client().get("/api/two/").await.unwrap();

    assert_eq!(response.body["served_with"], "A3");
    assert_eq!(
        h.backend.refresh_calls(),
        vec!["R1".to_string(), "R1".to_string()]
    );
    assert_eq!(h.store.get().unwrap().refresh(), "R3");
}
