//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde for the JSON API and the sync wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named folder that groups notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A note, optionally filed under a folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// `None` places the note in the "no folder" scope
    #[serde(default)]
    pub folder_id: Option<i64>,
    /// Position within the folder scope
    #[serde(default)]
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File attachment linked to a note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Attachment {
    pub id: i64,
    pub note_id: i64,
    /// Server-generated name of the blob in the content directory
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

/// Create folder request
#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
}

/// Rename folder request
#[derive(Debug, Deserialize)]
pub struct UpdateFolderRequest {
    pub name: String,
}

/// Create note request
#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub folder_id: Option<i64>,
}

/// Update note request; replaces title, content and folder
#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub folder_id: Option<i64>,
}

/// One entry of a folder reorder request
#[derive(Debug, Clone, Deserialize)]
pub struct NoteOrder {
    pub id: i64,
    pub order: i64,
}

/// Reorder notes request
#[derive(Debug, Deserialize)]
pub struct ReorderNotesRequest {
    #[serde(rename = "noteOrder")]
    pub note_order: Vec<NoteOrder>,
}

/// Counts of what one reconciliation changed on the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub folders_inserted: i64,
    pub folders_existing: i64,
    pub notes_inserted: i64,
    pub notes_updated: i64,
    pub notes_skipped: i64,
}

/// Audit record of a committed reconciliation
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SyncLogEntry {
    pub id: i64,
    pub device_id: String,
    pub last_sync: DateTime<Utc>,
    pub server_time: DateTime<Utc>,
    pub folders_inserted: i64,
    pub notes_inserted: i64,
    pub notes_updated: i64,
    pub notes_skipped: i64,
}

/// Snapshot a device pushes when it synchronizes
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub device_id: String,
    pub last_sync: DateTime<Utc>,
    #[serde(default)]
    pub local_notes: Vec<Note>,
    #[serde(default)]
    pub local_folders: Vec<Folder>,
}

/// Server delta returned to a syncing device
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
    pub notes: Vec<Note>,
    pub folders: Vec<Folder>,
    pub attachments: Vec<Attachment>,
    pub server_time: DateTime<Utc>,
    pub success: bool,
    pub message: String,
}
