//! Real socket integration tests.
//!
//! These tests bind the router to an ephemeral local port and talk to it over
//! HTTP with `reqwest`, exercising the same path a deployed server takes.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::net::TcpListener;

use user_api::{create_router, UserDirectory, API_KEY_HEADER};

use super::test_utils::{test_config, TEST_API_KEY};

/// Start a server on 127.0.0.1 with an OS-assigned port.
async fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(Arc::new(UserDirectory::seeded()), test_config());

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    addr
}

#[tokio::test]
async fn test_served_health_route() {
    let addr = spawn_server().await;

    let response = reqwest::get(format!("http://{}/", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"message": "API is running!"}));
}

#[tokio::test]
async fn test_served_users_with_key() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/users", addr))
        .header(API_KEY_HEADER, TEST_API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!([
            {"id": 1, "name": "John Doe"},
            {"id": 2, "name": "Jane Doe"}
        ])
    );
}

#[tokio::test]
async fn test_served_users_without_key() {
    let addr = spawn_server().await;

    let response = reqwest::get(format!("http://{}/users/1", addr))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"message": "Unauthorized"}));
}

#[tokio::test]
async fn test_served_concurrent_requests() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let requests = (0..16).map(|i| {
        let client = client.clone();
        let id = i % 2 + 1;
        async move {
            client
                .get(format!("http://{}/users/{}", addr, id))
                .header(API_KEY_HEADER, TEST_API_KEY)
                .send()
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap()
        }
    });

    let handles: Vec<_> = requests.map(tokio::spawn).collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let body = handle.await.unwrap();
        assert_eq!(body["id"], json!(i % 2 + 1));
    }
}
