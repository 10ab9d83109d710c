//! HTTP smoke tests against a running server.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p rich-habits-server)
//!
//! Run with: `RH_TEST_BASE_URL=http://localhost:3000 cargo test -p rich-habits-integration-tests -- --ignored`

use reqwest::{Client, StatusCode};
use rich_habits_integration_tests::test_base_url;
use serde_json::{Value, json};

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_health_reports_healthy() {
    let resp = client()
        .get(format!("{}/api/health", test_base_url()))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_ready_checks_every_dependency() {
    let resp = client()
        .get(format!("{}/api/ready", test_base_url()))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["checks"]["database"], true);
    assert_eq!(body["checks"]["session"], true);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_protected_route_requires_login() {
    let resp = client()
        .get(format!("{}/api/orders", test_base_url()))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["loginUrl"], "/api/auth/login");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_login_without_csrf_token_is_rejected() {
    let resp = client()
        .post(format!("{}/api/auth/login", test_base_url()))
        .json(&json!({"email": "nobody@example.com", "password": "not-a-password"}))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_bad_credentials_with_csrf_token_are_unauthorized() {
    let client = client();
    let base = test_base_url();

    let token: Value = client
        .get(format!("{base}/api/auth/csrf-token"))
        .send()
        .await
        .expect("token request")
        .json()
        .await
        .expect("json");
    let token = token["csrfToken"].as_str().expect("token").to_string();

    let resp = client
        .post(format!("{base}/api/auth/login"))
        .header("x-csrf-token", token)
        .json(&json!({"email": "nobody@example.com", "password": "not-a-password"}))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
