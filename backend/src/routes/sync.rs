//! Sync routes

use super::attachments::{blob_response, content_disposition};
use crate::app::AppState;
use crate::database::{SyncLogEntry, SyncRequest, SyncResponse};
use crate::error::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderValue;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

pub async fn sync_health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "message": "Sync endpoint is ready",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Reconcile a device snapshot and return the server delta
pub async fn sync(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Json<SyncResponse>> {
    let Json(req) = payload?;

    let delta = state
        .sync_service
        .reconcile(
            &req.device_id,
            req.last_sync,
            &req.local_folders,
            &req.local_notes,
        )
        .await?;

    Ok(Json(delta.into_response()))
}

/// Raw attachment bytes for a syncing device
pub async fn download_attachment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let (attachment, data) = state.attachments_service.read_attachment(id).await?;

    Ok(blob_response(
        HeaderValue::from_static("application/octet-stream"),
        content_disposition("attachment", &attachment.original_name),
        data,
    ))
}

pub async fn sync_history(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<Vec<SyncLogEntry>>> {
    Ok(Json(state.sync_service.history(&device_id).await?))
}
