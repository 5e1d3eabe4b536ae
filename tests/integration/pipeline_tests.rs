//! Pipeline and transport layer integration tests.
//!
//! Tests verify:
//! - Handler failures and panics become the uniform 500 reply
//! - Malformed or oversized JSON bodies go through the error translator
//! - Security headers, CORS and compression wrap every response

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::json;

use user_api::server::user_routes;
use user_api::{
    mount_pipeline, ApiError, ApiKey, Pipeline, Reply, RequestContext, UserDirectory,
};

use super::test_utils::{
    get, get_authed, json_request, send, test_config, test_router, TEST_API_KEY,
};

/// Router with the user routes plus routes that fail in various ways.
fn faulty_router() -> Router {
    let pipeline = Pipeline::builder()
        .protect("/users", ApiKey::new(TEST_API_KEY))
        .routes(user_routes(Arc::new(UserDirectory::seeded())))
        .route(Method::GET, "/fail", |_: &RequestContext| -> Result<Reply, ApiError> {
            Err(ApiError::new("Database exploded"))
        })
        .route(Method::GET, "/fail-silently", |_: &RequestContext| -> Result<Reply, ApiError> {
            Err(ApiError::new(""))
        })
        .route(Method::GET, "/panic", |_: &RequestContext| -> Result<Reply, ApiError> {
            panic!("handler exploded")
        })
        .route(Method::POST, "/echo", |ctx: &RequestContext| {
            Reply::ok(&json!({ "received": ctx.json() }))
        })
        .build();

    mount_pipeline(pipeline, &test_config())
}

// =============================================================================
// Error Translation
// =============================================================================

#[tokio::test]
async fn test_failing_handler_returns_500_with_message() {
    let response = get(faulty_router(), "/fail").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json(), json!({"message": "Database exploded"}));
}

#[tokio::test]
async fn test_empty_failure_message_falls_back() {
    let response = get(faulty_router(), "/fail-silently").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json(), json!({"message": "Internal Server Error"}));
}

#[tokio::test]
async fn test_panicking_handler_returns_500() {
    let response = get(faulty_router(), "/panic").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json(), json!({"message": "handler exploded"}));
    assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
}

#[tokio::test]
async fn test_router_survives_panic() {
    let router = faulty_router();

    let response = get(router.clone(), "/panic").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    let response = get(router, "/").await;
    assert_eq!(response.status, StatusCode::OK);
}

// =============================================================================
// Body Parsing
// =============================================================================

#[tokio::test]
async fn test_json_body_reaches_handler() {
    let response = send(
        faulty_router(),
        json_request(Method::POST, "/echo", r#"{"name":"Jim"}"#),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"received": {"name": "Jim"}}));
}

#[tokio::test]
async fn test_malformed_json_returns_500() {
    let response = send(
        test_router(),
        json_request(Method::POST, "/users", "{not valid json"),
    )
    .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = response.json()["message"].as_str().unwrap().to_string();
    assert!(!message.is_empty());
}

#[tokio::test]
async fn test_malformed_json_fails_before_auth() {
    // Body parsing is the first stage, so even unauthenticated requests fail here
    let request = Request::builder()
        .method(Method::POST)
        .uri("/users")
        .header("content-type", "application/json")
        .body(Body::from("{"))
        .unwrap();

    let response = send(test_router(), request).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_oversized_json_returns_500() {
    let router = user_api::create_router(
        Arc::new(UserDirectory::seeded()),
        test_config().with_body_limit(16),
    );
    let body = format!(r#"{{"name":"{}"}}"#, "x".repeat(64));

    let response = send(router, json_request(Method::POST, "/users", body)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json(), json!({"message": "request entity too large"}));
}

#[tokio::test]
async fn test_non_json_body_is_not_parsed() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .header("content-type", "text/plain")
        .body(Body::from("{not valid json"))
        .unwrap();

    let response = send(faulty_router(), request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"received": null}));
}

// =============================================================================
// Security Headers
// =============================================================================

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let cases = [
        get(test_router(), "/").await,
        get(test_router(), "/users").await,
        get_authed(test_router(), "/users/99").await,
        get(test_router(), "/nowhere").await,
        get(faulty_router(), "/fail").await,
    ];

    for response in &cases {
        assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(response.header("x-frame-options"), Some("SAMEORIGIN"));
        assert!(response.header("content-security-policy").is_some());
        assert!(response.header("strict-transport-security").is_some());
        assert!(response.header("x-powered-by").is_none());
    }
}

// =============================================================================
// CORS
// =============================================================================

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let request = Request::builder()
        .uri("/")
        .header("origin", "https://example.com")
        .body(Body::empty())
        .unwrap();

    let response = send(test_router(), request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
}

#[tokio::test]
async fn test_cors_preflight_allows_api_key_header() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/users")
        .header("origin", "https://example.com")
        .header("access-control-request-method", "GET")
        .header("access-control-request-headers", "x-api-key")
        .body(Body::empty())
        .unwrap();

    let response = send(test_router(), request).await;
    assert!(response.status.is_success());
    let allowed = response
        .header("access-control-allow-headers")
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("x-api-key"));
}

#[tokio::test]
async fn test_cors_restricted_origins() {
    let router = user_api::create_router(
        Arc::new(UserDirectory::seeded()),
        test_config().with_cors_origins(vec!["https://allowed.example".to_string()]),
    );

    let request = Request::builder()
        .uri("/")
        .header("origin", "https://allowed.example")
        .body(Body::empty())
        .unwrap();
    let response = send(router.clone(), request).await;
    assert_eq!(
        response.header("access-control-allow-origin"),
        Some("https://allowed.example")
    );

    let request = Request::builder()
        .uri("/")
        .header("origin", "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = send(router, request).await;
    assert!(response.header("access-control-allow-origin").is_none());
}

// =============================================================================
// Compression
// =============================================================================

#[tokio::test]
async fn test_gzip_when_accepted() {
    let request = Request::builder()
        .uri("/users")
        .header("x-api-key", TEST_API_KEY)
        .header("accept-encoding", "gzip")
        .body(Body::empty())
        .unwrap();

    let response = send(test_router(), request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-encoding"), Some("gzip"));
}

#[tokio::test]
async fn test_no_compression_without_accept_encoding() {
    let response = get_authed(test_router(), "/users").await;
    assert!(response.header("content-encoding").is_none());
}
