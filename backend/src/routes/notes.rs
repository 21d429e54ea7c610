//! Note routes
//!
//! CRUD for notes, folder-scoped listing and manual reordering.

use crate::app::AppState;
use crate::database::{CreateNoteRequest, Note, ReorderNotesRequest, UpdateNoteRequest};
use crate::error::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

/// List all notes
pub async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>> {
    Ok(Json(state.notes_service.list_notes().await?))
}

/// Create a note; `folder_id` in the body is optional
pub async fn create_note(
    State(state): State<AppState>,
    payload: JsonBody<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>)> {
    let Json(req) = payload?;
    let note = state.notes_service.create_note(req).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// Get a note by ID
pub async fn get_note(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Note>> {
    Ok(Json(state.notes_service.get_note(id).await?))
}

/// Update a note
pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: JsonBody<UpdateNoteRequest>,
) -> Result<Json<Note>> {
    let Json(req) = payload?;
    Ok(Json(state.notes_service.update_note(id, req).await?))
}

/// Delete a note and its attachments
pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    state.notes_service.delete_note(id).await?;
    Ok(Json(json!({ "message": "Note deleted successfully" })))
}

pub async fn list_folder_notes(
    State(state): State<AppState>,
    Path(folder_id): Path<i64>,
) -> Result<Json<Vec<Note>>> {
    Ok(Json(state.notes_service.list_notes_in_folder(folder_id).await?))
}

/// Create a note inside the folder named by the path
pub async fn create_folder_note(
    State(state): State<AppState>,
    Path(folder_id): Path<i64>,
    payload: JsonBody<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>)> {
    let Json(mut req) = payload?;
    req.folder_id = Some(folder_id);
    let note = state.notes_service.create_note(req).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn reorder_notes(
    State(state): State<AppState>,
    Path(folder_id): Path<i64>,
    payload: JsonBody<ReorderNotesRequest>,
) -> Result<Json<Value>> {
    let Json(req) = payload?;
    let updated = state
        .notes_service
        .reorder_notes(folder_id, &req.note_order)
        .await?;
    Ok(Json(json!({
        "message": "Notes reordered successfully",
        "updated": updated,
    })))
}
