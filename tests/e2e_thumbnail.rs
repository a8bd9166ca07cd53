//! Upload-to-thumbnail flow: the API enqueues, a worker derives, the API serves.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{png_base64, x_token, TestApp};
use serde_json::{json, Value};

use filebox::jobs::{ThumbnailHandler, ThumbnailJob};
use filebox::queue::{enqueue, JobState, Worker, WorkerOptions};

fn thumbnail_worker(app: &TestApp) -> Worker<ThumbnailHandler> {
    let handler = ThumbnailHandler::new(app.db.clone(), app.blobs.clone());
    Worker::new(app.queue.clone(), Arc::new(handler), WorkerOptions::default())
}

#[tokio::test]
async fn test_upload_then_thumbnails_are_served() {
    let app = TestApp::new().await;
    let (_, token) = app.signup_and_login("bob@example.com", "secret").await;
    let image = app
        .upload(
            &token,
            json!({ "name": "photo.png", "type": "image", "data": png_base64(40, 20) }),
        )
        .await;
    let path = format!("/files/{}/data", image["id"]);

    let processed = thumbnail_worker(&app).drain().await.unwrap();
    assert_eq!(processed, 1);

    for (size, height) in [(100u32, 50u32), (250, 125), (500, 250)] {
        let response = app.server.get(&path).add_query_param("size", size).await;

        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "image/png");
        let thumbnail = image::load_from_memory(response.as_bytes()).unwrap();
        assert_eq!(thumbnail.width(), size);
        assert_eq!(thumbnail.height(), height);
    }

    // The original is untouched.
    let response = app
        .server
        .get(&path)
        .add_header(x_token(), token)
        .await;
    response.assert_status_ok();
    let original = image::load_from_memory(response.as_bytes()).unwrap();
    assert_eq!((original.width(), original.height()), (40, 20));

    let stats = app.queue.stats("fileQueue").await.unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.enqueued, 0);
}

#[tokio::test]
async fn test_job_for_non_image_is_dead_lettered() {
    let app = TestApp::new().await;
    let (user_id, token) = app.signup_and_login("bob@example.com", "secret").await;
    let folder = app
        .upload(&token, json!({ "name": "docs", "type": "folder" }))
        .await;
    let job = ThumbnailJob::new(user_id, folder["id"].as_i64().unwrap());
    enqueue(app.queue.as_ref(), &job).await.unwrap();

    let worker = thumbnail_worker(&app);
    let processed = worker.run_once().await.unwrap().unwrap();

    assert_eq!(processed.state, JobState::Failed);
    let dead = app.queue.dead_letters("fileQueue").await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].last_error.as_deref(), Some("File is not an image"));
}

#[tokio::test]
async fn test_job_for_other_owner_is_dead_lettered() {
    let app = TestApp::new().await;
    let (_, owner) = app.signup_and_login("bob@example.com", "secret").await;
    let (other_id, _) = app.signup_and_login("amy@example.com", "secret").await;
    let image = app
        .upload(
            &owner,
            json!({ "name": "photo.png", "type": "image", "data": png_base64(10, 10) }),
        )
        .await;

    // Drop the genuine job so only the mismatched one is claimable.
    thumbnail_worker(&app).drain().await.unwrap();
    let job = ThumbnailJob::new(other_id, image["id"].as_i64().unwrap());
    enqueue(app.queue.as_ref(), &job).await.unwrap();

    let processed = thumbnail_worker(&app).run_once().await.unwrap().unwrap();

    assert_eq!(processed.state, JobState::Failed);
    let dead = app.queue.dead_letters("fileQueue").await.unwrap();
    assert_eq!(dead[0].last_error.as_deref(), Some("File not found"));
}

#[tokio::test]
async fn test_thumbnail_of_document_is_not_found() {
    let app = TestApp::new().await;
    let (_, token) = app.signup_and_login("bob@example.com", "secret").await;
    let file = app
        .upload(
            &token,
            json!({ "name": "a.txt", "type": "file", "isPublic": true, "data": "aGk=" }),
        )
        .await;

    let response = app
        .server
        .get(&format!("/files/{}/data", file["id"]))
        .add_query_param("size", 250)
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "Not found");
}
