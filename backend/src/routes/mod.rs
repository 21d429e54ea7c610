//! HTTP routes
//!
//! One submodule per resource. Handlers are thin: they extract, call the
//! repository or a service, and let `AppError` render failures.

pub mod attachments;
pub mod folders;
pub mod notes;
pub mod sync;

use crate::app::AppState;
use crate::config::MULTIPART_OVERHEAD_BYTES;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.attachments_service.max_bytes() + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health))
        // Folders
        .route(
            "/folders",
            get(folders::list_folders).post(folders::create_folder),
        )
        .route(
            "/folders/:id",
            put(folders::update_folder).delete(folders::delete_folder),
        )
        .route(
            "/folders/:id/notes",
            get(notes::list_folder_notes).post(notes::create_folder_note),
        )
        .route("/folders/:id/notes/reorder", put(notes::reorder_notes))
        // Notes
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route(
            "/notes/:id",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .route("/notes/:id/attachments", get(attachments::list_attachments))
        // Attachments
        .route(
            "/files/:id",
            get(attachments::serve_file).post(attachments::upload_file),
        )
        // Sync
        .route("/sync", post(sync::sync))
        .route("/sync/health", get(sync::sync_health))
        .route("/sync/attachment/:id", get(sync::download_attachment))
        .route("/sync/history/:device_id", get(sync::sync_history))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Permissive CORS: any origin is mirrored back and credentials are allowed
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
