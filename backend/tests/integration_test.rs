//! Integration tests for notesync
//!
//! These tests drive the full router against a real on-disk database:
//! - Folder and note lifecycle over HTTP
//! - Sync round trips
//! - Multipart upload and download
//! - Persistence across restarts

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use notesync::app::AppState;
use notesync::config::ServerConfig;
use notesync::routes;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "notesync-test-boundary";

fn test_config(temp_dir: &TempDir) -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        data_dir: temp_dir.path().join("data"),
        max_attachment_bytes: 1024,
    }
}

/// Helper to create a router over a fresh data directory
async fn create_test_app() -> (Router, AppState, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let state = AppState::initialize(test_config(&temp_dir)).await.unwrap();
    (routes::router(state.clone()), state, temp_dir)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

async fn upload(app: &Router, note_id: i64, filename: &str, data: &[u8]) -> (StatusCode, Value) {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/plain\r\n\r\n",
        b = BOUNDARY,
        f = filename
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri(format!("/files/{}", note_id))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (app, _state, _temp) = create_test_app().await;

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, "GET", "/sync/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_folder_lifecycle() {
    let (app, _state, _temp) = create_test_app().await;

    let (status, folders) = send(&app, "GET", "/folders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(folders.as_array().unwrap().len(), 3);

    let (status, folder) = send(&app, "POST", "/folders", Some(json!({ "name": "Ideas" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let folder_id = folder["id"].as_i64().unwrap();

    let (status, _) = send(&app, "POST", "/folders", Some(json!({ "name": "Ideas" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "POST", "/folders", Some(json!({ "name": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, note) = send(
        &app,
        "POST",
        &format!("/folders/{}/notes", folder_id),
        Some(json!({ "title": "Plan", "content": "draft" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["folder_id"], folder_id);
    assert_eq!(note["order_index"], 1);

    let (status, body) = send(&app, "DELETE", &format!("/folders/{}", folder_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "Cannot delete folder with notes: folder contains 1 notes"
    );

    let note_id = note["id"].as_i64().unwrap();
    let (status, _) = send(&app, "DELETE", &format!("/notes/{}", note_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &format!("/folders/{}", folder_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &format!("/folders/{}", folder_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_note_routes() {
    let (app, _state, _temp) = create_test_app().await;

    let (status, note) = send(
        &app,
        "POST",
        "/notes",
        Some(json!({ "title": "Loose", "content": "unfiled" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(note["folder_id"].is_null());
    let note_id = note["id"].as_i64().unwrap();

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/notes/{}", note_id),
        Some(json!({ "title": "Filed", "content": "now in Work", "folder_id": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["folder_id"], 2);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/notes/{}", note_id),
        Some(json!({ "title": "x", "content": "y", "folder_id": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, second) = send(
        &app,
        "POST",
        "/folders/2/notes",
        Some(json!({ "title": "Second", "content": "" })),
    )
    .await;
    let second_id = second["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        "/folders/2/notes/reorder",
        Some(json!({ "noteOrder": [
            { "id": note_id, "order": 20 },
            { "id": second_id, "order": 10 }
        ] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 2);

    let (_, listed) = send(&app, "GET", "/folders/2/notes", None).await;
    let ids: Vec<i64> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![note_id, second_id]);

    let (status, _) = send(&app, "GET", "/notes/12345", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, _state, _temp) = create_test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/notes")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_without_multipart_is_bad_request() {
    let (app, _state, _temp) = create_test_app().await;

    let (status, note) = send(
        &app,
        "POST",
        "/notes",
        Some(json!({ "title": "Doc", "content": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let note_id = note["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/files/{}", note_id),
        Some(json!({ "file": "not multipart" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, attachments) =
        send(&app, "GET", &format!("/notes/{}/attachments", note_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(attachments.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_round_trip() {
    let (app, _state, _temp) = create_test_app().await;

    let t0 = Utc::now() + Duration::seconds(1);
    let (status, body) = send(
        &app,
        "POST",
        "/sync",
        Some(json!({
            "device_id": "A",
            "last_sync": t0,
            "local_notes": [{
                "id": 5,
                "title": "x",
                "content": "",
                "created_at": t0,
                "updated_at": t0 + Duration::seconds(10)
            }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Synced 1 notes, 0 folders, 0 attachments");
    assert_eq!(body["notes"][0]["id"], 5);
    assert_eq!(body["folders"], json!([]));
    assert!(body["server_time"].is_string());

    // The merged note is visible through the regular API
    let (status, note) = send(&app, "GET", "/notes/5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(note["title"], "x");

    let (status, history) = send(&app, "GET", "/sync/history/A", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["notes_inserted"], 1);

    let (status, _) = send(
        &app,
        "POST",
        "/sync",
        Some(json!({ "device_id": "", "last_sync": t0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sync_failure_is_atomic() {
    let (app, _state, _temp) = create_test_app().await;
    let t = Utc::now() - Duration::hours(1);

    let (status, _) = send(
        &app,
        "POST",
        "/sync",
        Some(json!({
            "device_id": "B",
            "last_sync": t,
            "local_folders": [{ "id": 50, "name": "Synced", "created_at": t }],
            "local_notes": [{
                "id": 60,
                "title": "orphan",
                "content": "",
                "folder_id": 404,
                "created_at": t,
                "updated_at": t
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, folders) = send(&app, "GET", "/folders", None).await;
    assert_eq!(folders.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_upload_and_download() {
    let (app, _state, _temp) = create_test_app().await;

    let (_, note) = send(
        &app,
        "POST",
        "/notes",
        Some(json!({ "title": "With file", "content": "" })),
    )
    .await;
    let note_id = note["id"].as_i64().unwrap();

    let (status, attachment) = upload(&app, note_id, "hello.txt", b"hello world").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(attachment["original_name"], "hello.txt");
    assert_eq!(attachment["mime_type"], "text/plain");
    assert_eq!(attachment["size"], 11);
    let attachment_id = attachment["id"].as_i64().unwrap();

    // Inline download with the recorded type
    let request = Request::builder()
        .uri(format!("/files/{}", attachment_id))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("inline"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"hello world");

    // Sync download framing
    let request = Request::builder()
        .uri(format!("/sync/attachment/{}", attachment_id))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "11");

    let (status, listed) = send(&app, "GET", &format!("/notes/{}/attachments", note_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = upload(&app, note_id, "big.txt", &[b'x'; 2048]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = upload(&app, 9999, "lost.txt", b"data").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/files/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_state_persists_across_restart() {
    let temp_dir = TempDir::new().unwrap();

    let state = AppState::initialize(test_config(&temp_dir)).await.unwrap();
    let app = routes::router(state.clone());
    let (_, note) = send(
        &app,
        "POST",
        "/notes",
        Some(json!({ "title": "Durable", "content": "kept" })),
    )
    .await;
    state.close().await;

    let state = AppState::initialize(test_config(&temp_dir)).await.unwrap();
    let app = routes::router(state.clone());

    let (status, fetched) = send(&app, "GET", &format!("/notes/{}", note["id"]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Durable");

    let (_, folders) = send(&app, "GET", "/folders", None).await;
    assert_eq!(folders.as_array().unwrap().len(), 3);

    state.close().await;
}
