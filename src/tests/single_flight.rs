use std::time::Duration;

use rand::Rng;
use serde_json::json;

use crate::strategy::OAUTH_AUTH_URL;
use crate::tests::test_support::{initial_tokens, oauth_harness, refreshed_tokens, requires_bearer};
use crate::transport::{MockResponse, MockRule};
use crate::types::AUTHORIZATION;

fn bearer_count(calls: &[crate::types::RequestDescriptor], bearer: &str) -> usize {
    calls
        .iter()
        .filter(|call| call.header_value(AUTHORIZATION) == Some(bearer))
        .count()
}

#[tokio::test]
async fn simultaneous_401s_share_one_refresh() {
    tokio::time::pause();
    let h = oauth_harness(Some(initial_tokens()));
    h.transport
        .mount(requires_bearer("A2", json!({ "data": "data" })).url("x"));
    h.transport.mount(
        MockRule::new(MockResponse::ok(refreshed_tokens()))
            .url(OAUTH_AUTH_URL)
            .delay(Duration::from_millis(50)),
    );

    let (first, second) = tokio::join!(h.api.get("x"), h.api.get("x"));

    assert!(first.expect("outcome").is_success());
    assert!(second.expect("outcome").is_success());
    assert_eq!(h.transport.calls_to(OAUTH_AUTH_URL).len(), 1);
    assert_eq!(h.store.writes().len(), 1);
    assert_eq!(bearer_count(&h.transport.calls_to("x"), "Bearer A2"), 2);
}

#[tokio::test]
async fn burst_of_callers_refreshes_once() {
    tokio::time::pause();
    let callers: usize = rand::thread_rng().gen_range(3..12);
    let h = oauth_harness(Some(initial_tokens()));
    h.transport
        .mount(requires_bearer("A2", json!({ "data": "data" })).url("x"));
    h.transport.mount(
        MockRule::new(MockResponse::ok(refreshed_tokens()))
            .url(OAUTH_AUTH_URL)
            .delay(Duration::from_millis(50)),
    );

    let handles: Vec<_> = (0..callers)
        .map(|_| {
            let api = h.api.clone();
            tokio::spawn(async move { api.get("x").await })
        })
        .collect();
    for handle in handles {
        let outcome = handle.await.unwrap().expect("outcome");
        assert_eq!(outcome.success().unwrap().data, json!({ "data": "data" }));
    }

    let calls = h.transport.calls_to("x");
    assert_eq!(h.transport.calls_to(OAUTH_AUTH_URL).len(), 1);
    assert_eq!(bearer_count(&calls, "Bearer A2"), callers);
    let stale = bearer_count(&calls, "Bearer A1");
    assert!(
        (1..=callers).contains(&stale),
        "unexpected stale dispatch count {stale} for {callers} callers"
    );
    assert!(h.failures().is_empty());
    assert_eq!(h.api.pending_requests().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clones_across_threads_share_refresh_state() {
    let h = oauth_harness(Some(initial_tokens()));
    h.transport
        .mount(requires_bearer("A2", json!({})).url("x"));
    h.transport.mount(
        MockRule::new(MockResponse::ok(refreshed_tokens()))
            .url(OAUTH_AUTH_URL)
            .delay(Duration::from_millis(200)),
    );

    let first = h.api.get("x").await.expect("outcome");
    assert!(first.is_success());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let api = h.api.clone();
            tokio::spawn(async move { api.get("x").await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().expect("outcome").is_success());
    }

    // tokens are already fresh, so nothing refreshes a second time
    assert_eq!(h.transport.calls_to(OAUTH_AUTH_URL).len(), 1);
    assert_eq!(bearer_count(&h.transport.calls_to("x"), "Bearer A2"), 9);
}
