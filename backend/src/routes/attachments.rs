//! Attachment routes
//!
//! Multipart upload and inline download of note attachments.

use crate::app::AppState;
use crate::config::DEFAULT_MIME_TYPE;
use crate::database::Attachment;
use crate::error::{AppError, Result};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Multipart field carrying the uploaded file
const FILE_FIELD: &str = "file";

/// Upload a file for the note named by the path
pub async fn upload_file(
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Attachment>)> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        let attachment = state
            .attachments_service
            .create_attachment(note_id, &original_name, mime_type.as_deref(), &data)
            .await?;

        return Ok((StatusCode::CREATED, Json(attachment)));
    }

    Err(AppError::Validation("No file uploaded".to_string()))
}

/// Serve an attachment inline with its recorded MIME type
pub async fn serve_file(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    let (attachment, data) = state.attachments_service.read_attachment(id).await?;

    let content_type = HeaderValue::from_str(&attachment.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_MIME_TYPE));

    Ok(blob_response(
        content_type,
        content_disposition("inline", &attachment.original_name),
        data,
    ))
}

pub async fn list_attachments(
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
) -> Result<Json<Vec<Attachment>>> {
    Ok(Json(state.attachments_service.list_attachments(note_id).await?))
}

/// Build a response carrying raw blob bytes
pub(crate) fn blob_response(
    content_type: HeaderValue,
    disposition: HeaderValue,
    data: Vec<u8>,
) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(data.len())),
        ],
        data,
    )
        .into_response()
}

/// `Content-Disposition` value; names that cannot be carried in a header are dropped
pub(crate) fn content_disposition(kind: &'static str, original_name: &str) -> HeaderValue {
    let name = original_name.replace('"', "");
    HeaderValue::from_str(&format!("{}; filename=\"{}\"", kind, name))
        .unwrap_or_else(|_| HeaderValue::from_static(kind))
}
