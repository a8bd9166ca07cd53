//! Web API Authentication Tests
//!
//! Signup, connect, disconnect and the session-backed endpoints.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use common::{basic_auth, x_token, TestApp};
use serde_json::{json, Value};

// ============================================================================
// Status
// ============================================================================

#[tokio::test]
async fn test_status_reports_both_stores() {
    let app = TestApp::new().await;

    let response = app.server.get("/status").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "db": true, "sessions": true }));
}

#[tokio::test]
async fn test_stats_counts_users_and_files() {
    let app = TestApp::new().await;
    let (_, token) = app.signup_and_login("bob@example.com", "secret").await;
    app.upload(&token, json!({ "name": "docs", "type": "folder" }))
        .await;

    let body = app.server.get("/stats").await.json::<Value>();

    assert_eq!(body, json!({ "users": 1, "files": 1 }));
}

// ============================================================================
// Signup
// ============================================================================

#[tokio::test]
async fn test_signup_success() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/users")
        .json(&json!({ "email": "bob@example.com", "password": "secret" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert!(body["id"].is_i64());
    assert_eq!(body["email"], "bob@example.com");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_signup_missing_email() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/users")
        .json(&json!({ "password": "secret" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Missing email");
}

#[tokio::test]
async fn test_signup_missing_password() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/users")
        .json(&json!({ "email": "bob@example.com" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Missing password");
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let app = TestApp::new().await;
    app.signup("bob@example.com", "secret").await;

    let response = app
        .server
        .post("/users")
        .json(&json!({ "email": "bob@example.com", "password": "other" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Already exist");
}

#[tokio::test]
async fn test_signup_malformed_json() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/users")
        .content_type("application/json")
        .text("{not json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"].is_string());
}

// ============================================================================
// Connect
// ============================================================================

#[tokio::test]
async fn test_connect_returns_token() {
    let app = TestApp::new().await;
    app.signup("bob@example.com", "secret").await;

    let token = app.login("bob@example.com", "secret").await;

    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_connect_wrong_password() {
    let app = TestApp::new().await;
    app.signup("bob@example.com", "secret").await;

    let response = app
        .server
        .get("/connect")
        .add_header(AUTHORIZATION, basic_auth("bob@example.com", "wrong"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "Unauthorized");
}

#[tokio::test]
async fn test_connect_unknown_user() {
    let app = TestApp::new().await;

    let response = app
        .server
        .get("/connect")
        .add_header(AUTHORIZATION, basic_auth("nobody@example.com", "secret"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_connect_without_header() {
    let app = TestApp::new().await;

    let response = app.server.get("/connect").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "Unauthorized");
}

#[tokio::test]
async fn test_connect_malformed_header() {
    let app = TestApp::new().await;

    let response = app
        .server
        .get("/connect")
        .add_header(AUTHORIZATION, "Basic !!!not-base64!!!".to_string())
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_each_connect_issues_new_token() {
    let app = TestApp::new().await;
    app.signup("bob@example.com", "secret").await;

    let first = app.login("bob@example.com", "secret").await;
    let second = app.login("bob@example.com", "secret").await;

    assert_ne!(first, second);
}

// ============================================================================
// Me / Disconnect
// ============================================================================

#[tokio::test]
async fn test_me_returns_current_user() {
    let app = TestApp::new().await;
    let (user_id, token) = app.signup_and_login("bob@example.com", "secret").await;

    let response = app
        .server
        .get("/users/me")
        .add_header(x_token(), token)
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({ "id": user_id, "email": "bob@example.com" })
    );
}

#[tokio::test]
async fn test_me_without_token() {
    let app = TestApp::new().await;

    let response = app.server.get("/users/me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_unknown_token() {
    let app = TestApp::new().await;

    let response = app
        .server
        .get("/users/me")
        .add_header(x_token(), "not-a-session".to_string())
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_disconnect_ends_session() {
    let app = TestApp::new().await;
    let (_, token) = app.signup_and_login("bob@example.com", "secret").await;

    let response = app
        .server
        .get("/disconnect")
        .add_header(x_token(), token.clone())
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    app.server
        .get("/users/me")
        .add_header(x_token(), token.clone())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // A second disconnect has no session left to end.
    app.server
        .get("/disconnect")
        .add_header(x_token(), token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_disconnect_leaves_other_sessions() {
    let app = TestApp::new().await;
    app.signup("bob@example.com", "secret").await;
    let first = app.login("bob@example.com", "secret").await;
    let second = app.login("bob@example.com", "secret").await;

    app.server
        .get("/disconnect")
        .add_header(x_token(), first)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server
        .get("/users/me")
        .add_header(x_token(), second)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_signup_enqueues_welcome_job() {
    let app = TestApp::new().await;
    app.signup("bob@example.com", "secret").await;

    let stats = app.queue.stats("userQueue").await.unwrap();

    assert_eq!(stats.enqueued, 1);
}
