//! Folder routes
//!
//! Folder CRUD goes straight to the repository; there is no folder service.

use crate::app::AppState;
use crate::database::{CreateFolderRequest, Folder, UpdateFolderRequest};
use crate::error::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// List all folders
pub async fn list_folders(State(state): State<AppState>) -> Result<Json<Vec<Folder>>> {
    Ok(Json(state.db.list_folders().await?))
}

/// Create a folder
pub async fn create_folder(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateFolderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Folder>)> {
    let Json(req) = payload?;
    let folder = state.db.create_folder(req).await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

/// Rename a folder
pub async fn update_folder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: std::result::Result<Json<UpdateFolderRequest>, JsonRejection>,
) -> Result<Json<Folder>> {
    let Json(req) = payload?;
    Ok(Json(state.db.update_folder(id, req).await?))
}

/// Delete an empty folder
pub async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    state.db.delete_folder(id).await?;
    Ok(Json(json!({ "message": "Folder deleted successfully" })))
}
