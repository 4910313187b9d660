use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use crate::strategy::{
    AuthParams, JWT_AUTH_URL, JwtAuthContext, JwtStrategy, OAUTH_AUTH_URL, PasswordCredentials,
    SharedJwtContext,
};
use crate::tests::test_support::{
    CLIENT_ID, CLIENT_SECRET, harness_with, initial_tokens, oauth_harness, refreshed_tokens,
    requires_bearer,
};
use crate::transport::MockResponse;
use crate::types::{AUTHORIZATION, ApiMethod, Tokens};

fn jwt_context(token: &str) -> JwtAuthContext {
    JwtAuthContext {
        auth_token: token.to_string(),
        organization_key: "org-key".to_string(),
    }
}

#[tokio::test]
async fn authenticate_exchanges_jwt_for_tokens() {
    let shared = Arc::new(SharedJwtContext::new(jwt_context("jwt-1")));
    let h = harness_with(
        JwtStrategy::new(shared.clone()).into(),
        None,
        |builder| builder,
    );
    h.transport.respond(
        ApiMethod::Post,
        JWT_AUTH_URL,
        MockResponse::ok(refreshed_tokens()),
    );

    assert_eq!(h.api.strategy().name(), "jwt");
    let outcome = h
        .api
        .authenticate(AuthParams::new().insert("ignored", true))
        .await
        .expect("outcome");

    let reply = outcome.success().expect("tokens");
    assert_eq!(reply.data.access_token, "A2");
    let call = &h.transport.calls_to(JWT_AUTH_URL)[0];
    assert_eq!(call.body, Some(json!({ "organizationKey": "org-key" })));
    assert_eq!(call.header_value(AUTHORIZATION), Some("Bearer jwt-1"));
    assert_eq!(
        h.store.writes(),
        vec![Tokens::new("A2", Some("R2".to_string()))]
    );
}

#[tokio::test]
async fn refresh_reidentifies_with_current_context() {
    let shared = Arc::new(SharedJwtContext::new(jwt_context("jwt-1")));
    let h = harness_with(
        JwtStrategy::new(shared.clone()).into(),
        Some(initial_tokens()),
        |builder| builder,
    );
    h.transport
        .mount(requires_bearer("A2", json!({ "data": "data" })).url("x"));
    h.transport.respond(
        ApiMethod::Post,
        JWT_AUTH_URL,
        MockResponse::ok(refreshed_tokens()),
    );

    shared.update(jwt_context("jwt-2")).await;
    let outcome = h.api.get("x").await.expect("outcome");

    assert!(outcome.is_success());
    let identify = h.transport.calls_to(JWT_AUTH_URL);
    assert_eq!(identify.len(), 1);
    // the refresh token plays no part in re-identification
    assert_eq!(identify[0].body, Some(json!({ "organizationKey": "org-key" })));
    assert_eq!(identify[0].header_value(AUTHORIZATION), Some("Bearer jwt-2"));
    assert!(h.transport.calls_to(OAUTH_AUTH_URL).is_empty());
}

#[tokio::test]
async fn password_sign_in_merges_params_into_body() {
    let h = oauth_harness(None);
    h.transport.respond(
        ApiMethod::Post,
        OAUTH_AUTH_URL,
        MockResponse::ok(refreshed_tokens()),
    );

    let outcome = h
        .api
        .authenticate(PasswordCredentials {
            username: "someone@example.com".into(),
            password: "hunter2".into(),
            subdomain: Some("acme".into()),
        })
        .await
        .expect("outcome");

    assert!(outcome.is_success());
    let call = &h.transport.calls_to(OAUTH_AUTH_URL)[0];
    assert_eq!(
        call.body,
        Some(json!({
            "grantType": "password",
            "username": "someone@example.com",
            "password": "hunter2",
            "subdomain": "acme",
            "clientId": CLIENT_ID,
            "clientSecret": CLIENT_SECRET
        }))
    );
    assert!(!call.has_header(AUTHORIZATION));
    assert_eq!(h.store.writes().len(), 1);
}

#[tokio::test]
async fn failed_sign_in_reports_once() {
    let h = oauth_harness(None);
    h.transport.respond(
        ApiMethod::Post,
        OAUTH_AUTH_URL,
        MockResponse::status(StatusCode::BAD_REQUEST).data(json!({ "error": "invalid_grant" })),
    );

    let outcome = h
        .api
        .authenticate(AuthParams::new().insert("username", "u").insert("password", "p"))
        .await
        .expect("outcome");

    let failure = outcome.failure().expect("failure");
    assert_eq!(failure.status, Some(StatusCode::BAD_REQUEST));
    assert_eq!(failure.data, json!({ "error": "invalid_grant" }));
    assert_eq!(h.failures().len(), 1);
    assert!(h.store.writes().is_empty());
}

#[tokio::test]
async fn malformed_token_payload_is_a_failure() {
    let h = oauth_harness(None);
    h.transport.respond(
        ApiMethod::Post,
        OAUTH_AUTH_URL,
        MockResponse::ok(json!({ "unexpected": true })),
    );

    let outcome = h.api.authenticate(AuthParams::new()).await.expect("outcome");

    assert!(outcome.is_error());
    assert_eq!(h.failures().len(), 1);
    assert!(h.store.writes().is_empty());
}
