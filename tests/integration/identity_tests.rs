//! Login flow integration tests.
//!
//! Tests verify:
//! - The /auth routes exist only when a provider is configured
//! - Login redirects to the provider
//! - A good callback code yields the principal and a session cookie
//! - Failed callbacks and logout redirect home

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::json;

use user_api::{create_router, Principal, StaticIdentityProvider, UserDirectory};

use super::test_utils::{get, request, send, test_config, test_router};

const AUTHORIZE_URL: &str = "https://provider.example/login/oauth/authorize?client_id=test";

fn identity_router() -> Router {
    let provider = StaticIdentityProvider::new("github", "GitHub", AUTHORIZE_URL)
        .with_login(
            "good-code",
            Principal::new("583231", Some("octocat".to_string()), None),
        );

    create_router(
        Arc::new(UserDirectory::seeded()),
        test_config().with_identity_provider(Arc::new(provider)),
    )
}

#[tokio::test]
async fn test_identity_routes_absent_by_default() {
    let response = get(test_router(), "/auth/github").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json(), json!({"message": "Route not found"}));
}

#[tokio::test]
async fn test_login_redirects_to_provider() {
    let response = get(identity_router(), "/auth/github").await;

    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header("location"), Some(AUTHORIZE_URL));
}

#[tokio::test]
async fn test_unknown_provider_not_found() {
    let response = get(identity_router(), "/auth/gitlab").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_other_methods_on_identity_routes_not_found() {
    let router = identity_router();

    for (method, uri) in [
        (Method::POST, "/auth/github"),
        (Method::DELETE, "/auth/github/callback"),
        (Method::PUT, "/auth/logout"),
    ] {
        let response = send(router.clone(), request(method.clone(), uri)).await;

        assert_eq!(response.status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(response.json(), json!({"message": "Route not found"}));
    }
}

#[tokio::test]
async fn test_callback_success() {
    let response = get(identity_router(), "/auth/github/callback?code=good-code").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "message": "GitHub login successful!",
            "user": {
                "id": "583231",
                "username": "octocat",
                "displayName": "Anonymous"
            }
        })
    );

    let cookie = response.header("set-cookie").unwrap();
    assert!(cookie.starts_with("sid="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_callback_bad_code_redirects_home() {
    let response = get(identity_router(), "/auth/github/callback?code=bad-code").await;

    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header("location"), Some("/"));
    assert!(response.header("set-cookie").is_none());
}

#[tokio::test]
async fn test_callback_missing_code_redirects_home() {
    let response = get(identity_router(), "/auth/github/callback").await;

    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header("location"), Some("/"));
}

#[tokio::test]
async fn test_logout_clears_session_cookie() {
    let router = identity_router();

    let login = get(router.clone(), "/auth/github/callback?code=good-code").await;
    let cookie = login.header("set-cookie").unwrap();
    let sid = cookie.split(';').next().unwrap().to_string();

    let request = Request::builder()
        .uri("/auth/logout")
        .header("cookie", sid)
        .body(Body::empty())
        .unwrap();
    let response = send(router, request).await;

    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header("location"), Some("/"));
    assert!(response.header("set-cookie").unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_identity_responses_carry_security_headers() {
    let response = get(identity_router(), "/auth/github").await;
    assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
}

#[tokio::test]
async fn test_user_routes_still_protected_with_identity() {
    let response = get(identity_router(), "/users").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}
