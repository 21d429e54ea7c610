//! Error types for notesync
//!
//! All errors use thiserror for structured error handling.
//! Every variant maps onto an HTTP status when it reaches the API layer.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Folder not found: {0}")]
    FolderNotFound(i64),

    #[error("Note not found: {0}")]
    NoteNotFound(i64),

    #[error("Attachment not found: {0}")]
    AttachmentNotFound(i64),

    #[error("File not found on disk for attachment {id}: {filename}")]
    BlobMissing { id: i64, filename: String },

    #[error("Cannot delete folder with notes: folder contains {note_count} notes")]
    FolderNotEmpty { id: i64, note_count: i64 },

    #[error("Folder name already exists: {0}")]
    FolderNameTaken(String),

    #[error("Blob store error: {0}")]
    BlobStore(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::FolderNotFound(_)
            | AppError::NoteNotFound(_)
            | AppError::AttachmentNotFound(_)
            | AppError::BlobMissing { .. } => StatusCode::NOT_FOUND,
            AppError::FolderNotEmpty { .. } | AppError::FolderNameTaken(_) => StatusCode::CONFLICT,
            AppError::Database(_)
            | AppError::Io(_)
            | AppError::BlobStore(_)
            | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Validation(err.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
