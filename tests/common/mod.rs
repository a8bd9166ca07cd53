//! Shared helpers for the HTTP API tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, StatusCode};
use axum_test::TestServer;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use tempfile::TempDir;

use filebox::file::BlobStore;
use filebox::kv::MemoryKvStore;
use filebox::queue::JobQueue;
use filebox::{create_router, AppState, Database, LocalBlobStore, SqliteJobQueue};

/// Session token header.
pub fn x_token() -> HeaderName {
    HeaderName::from_static("x-token")
}

/// A router over an in-memory database and a temporary blob directory.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub blobs: Arc<dyn BlobStore>,
    pub queue: Arc<dyn JobQueue>,
    _storage: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let storage = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let blobs: Arc<dyn BlobStore> =
            Arc::new(LocalBlobStore::new(storage.path()).expect("Failed to create blob store"));
        let queue: Arc<dyn JobQueue> = Arc::new(SqliteJobQueue::new(db.clone()));

        let state = AppState::new(
            db.clone(),
            Arc::new(MemoryKvStore::new()),
            blobs.clone(),
            queue.clone(),
        );
        let server =
            TestServer::new(create_router(Arc::new(state))).expect("Failed to create test server");

        Self {
            server,
            db,
            blobs,
            queue,
            _storage: storage,
        }
    }

    /// Sign up a user and return the response JSON.
    pub async fn signup(&self, email: &str, password: &str) -> Value {
        let response = self
            .server
            .post("/users")
            .json(&json!({ "email": email, "password": password }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()
    }

    /// Log in with basic credentials and return the session token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .server
            .get("/connect")
            .add_header(AUTHORIZATION, basic_auth(email, password))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["token"]
            .as_str()
            .expect("token in response")
            .to_string()
    }

    /// Sign up and log in, returning the user ID and a token.
    pub async fn signup_and_login(&self, email: &str, password: &str) -> (i64, String) {
        let user = self.signup(email, password).await;
        let token = self.login(email, password).await;
        (user["id"].as_i64().expect("user id"), token)
    }

    /// Create a file entry and return the response JSON.
    pub async fn upload(&self, token: &str, body: Value) -> Value {
        let response = self
            .server
            .post("/files")
            .add_header(x_token(), token.to_string())
            .json(&body)
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()
    }
}

/// `Authorization: Basic ...` header value.
pub fn basic_auth(email: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{email}:{password}")))
}

/// Base64 of a small solid PNG.
pub fn png_base64(width: u32, height: u32) -> String {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    STANDARD.encode(bytes)
}
