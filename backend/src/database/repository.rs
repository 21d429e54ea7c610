//! Repository layer for database operations
//!
//! This module provides CRUD operations for folders, notes and attachments,
//! plus the transaction-scoped queries the sync reconciler composes.
//! Multi-statement operations run inside a transaction.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

const FOLDER_COLUMNS: &str = "id, name, created_at";
const NOTE_COLUMNS: &str = "id, title, content, folder_id, order_index, created_at, updated_at";
const ATTACHMENT_COLUMNS: &str =
    "id, note_id, filename, original_name, mime_type, size, created_at";

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a transaction on a pooled connection
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    // ===== Folders =====

    /// Create a new folder
    pub async fn create_folder(&self, req: CreateFolderRequest) -> Result<Folder> {
        let name = validate_folder_name(&req.name)?;
        let now = Utc::now();

        let folder = sqlx::query_as::<_, Folder>(&format!(
            "INSERT INTO folders (name, created_at) VALUES (?, ?) RETURNING {}",
            FOLDER_COLUMNS
        ))
        .bind(&name)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| folder_name_error(e, &name))?;

        tracing::debug!("Created folder: {} ({})", folder.id, folder.name);
        Ok(folder)
    }

    /// Get a folder by ID
    pub async fn get_folder(&self, id: i64) -> Result<Folder> {
        sqlx::query_as::<_, Folder>(&format!(
            "SELECT {} FROM folders WHERE id = ?",
            FOLDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::FolderNotFound(id))
    }

    /// List all folders, oldest first
    pub async fn list_folders(&self) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {} FROM folders ORDER BY created_at ASC, id ASC",
            FOLDER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(folders)
    }

    /// Rename a folder
    pub async fn update_folder(&self, id: i64, req: UpdateFolderRequest) -> Result<Folder> {
        let name = validate_folder_name(&req.name)?;

        let folder = sqlx::query_as::<_, Folder>(&format!(
            "UPDATE folders SET name = ? WHERE id = ? RETURNING {}",
            FOLDER_COLUMNS
        ))
        .bind(&name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| folder_name_error(e, &name))?
        .ok_or(AppError::FolderNotFound(id))?;

        tracing::debug!("Renamed folder {} to {}", id, folder.name);
        Ok(folder)
    }

    /// Delete a folder that owns no notes
    ///
    /// The emptiness guard is part of the DELETE itself, so a note filed
    /// concurrently can never be orphaned by this call.
    pub async fn delete_folder(&self, id: i64) -> Result<()> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM folders
            WHERE id = ? AND NOT EXISTS (SELECT 1 FROM notes WHERE folder_id = ?)
            "#,
        )
        .bind(id)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if deleted > 0 {
            tracing::debug!("Deleted folder: {}", id);
            return Ok(());
        }

        let note_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes WHERE folder_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        if note_count > 0 {
            return Err(AppError::FolderNotEmpty { id, note_count });
        }

        Err(AppError::FolderNotFound(id))
    }

    pub async fn folder_exists(&self, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM folders WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    // ===== Notes =====

    /// Create a new note at the end of its folder scope
    ///
    /// The order index is computed by the INSERT itself so two concurrent
    /// creations in one scope cannot read the same maximum.
    pub async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        let now = Utc::now();

        let note = sqlx::query_as::<_, Note>(&format!(
            r#"
            INSERT INTO notes (title, content, folder_id, order_index, created_at, updated_at)
            SELECT ?, ?, ?, COALESCE(MAX(order_index), 0) + 1, ?, ?
            FROM notes WHERE folder_id IS ?
            RETURNING {}
            "#,
            NOTE_COLUMNS
        ))
        .bind(&req.title)
        .bind(&req.content)
        .bind(req.folder_id)
        .bind(now)
        .bind(now)
        .bind(req.folder_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| folder_reference_error(e, req.folder_id))?;

        tracing::debug!(
            "Created note: {} in folder {:?} at order {}",
            note.id,
            note.folder_id,
            note.order_index
        );
        Ok(note)
    }

    /// Get a note by ID
    pub async fn get_note(&self, id: i64) -> Result<Note> {
        sqlx::query_as::<_, Note>(&format!("SELECT {} FROM notes WHERE id = ?", NOTE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NoteNotFound(id))
    }

    /// List every note across all folders
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(&format!(
            "SELECT {} FROM notes ORDER BY order_index ASC, created_at DESC",
            NOTE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    /// List the notes filed under a folder, highest order first
    pub async fn list_notes_in_folder(&self, folder_id: i64) -> Result<Vec<Note>> {
        if !self.folder_exists(folder_id).await? {
            return Err(AppError::FolderNotFound(folder_id));
        }

        let notes = sqlx::query_as::<_, Note>(&format!(
            "SELECT {} FROM notes WHERE folder_id = ? ORDER BY order_index DESC, created_at ASC",
            NOTE_COLUMNS
        ))
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    /// Replace a note's title, content and folder
    pub async fn update_note(&self, id: i64, req: UpdateNoteRequest) -> Result<Note> {
        let now = Utc::now();

        let note = sqlx::query_as::<_, Note>(&format!(
            r#"
            UPDATE notes SET title = ?, content = ?, folder_id = ?, updated_at = ?
            WHERE id = ?
            RETURNING {}
            "#,
            NOTE_COLUMNS
        ))
        .bind(&req.title)
        .bind(&req.content)
        .bind(req.folder_id)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| folder_reference_error(e, req.folder_id))?
        .ok_or(AppError::NoteNotFound(id))?;

        tracing::debug!("Updated note: {}", id);
        Ok(note)
    }

    /// Delete a note together with its attachment rows
    ///
    /// Returns the stored filenames of the removed attachments so the caller
    /// can release their blobs.
    pub async fn delete_note(&self, id: i64) -> Result<Vec<String>> {
        let mut tx = self.pool.begin().await?;

        let filenames: Vec<String> =
            sqlx::query_scalar("DELETE FROM attachments WHERE note_id = ? RETURNING filename")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let rows = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NoteNotFound(id));
        }

        tx.commit().await?;

        tracing::debug!("Deleted note: {} ({} attachments)", id, filenames.len());
        Ok(filenames)
    }

    /// Assign explicit order indices to notes of one folder
    ///
    /// Entries naming notes outside the folder are ignored. Returns the
    /// number of notes whose order was written.
    pub async fn reorder_notes(&self, folder_id: i64, order: &[NoteOrder]) -> Result<u64> {
        if !self.folder_exists(folder_id).await? {
            return Err(AppError::FolderNotFound(folder_id));
        }

        let mut tx = self.pool.begin().await?;
        let mut updated = 0;

        for entry in order {
            updated += sqlx::query(
                "UPDATE notes SET order_index = ? WHERE id = ? AND folder_id = ?",
            )
            .bind(entry.order)
            .bind(entry.id)
            .bind(folder_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        tracing::debug!("Reordered {} notes in folder {}", updated, folder_id);
        Ok(updated)
    }

    pub async fn note_exists(&self, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    // ===== Attachments =====

    /// Record attachment metadata for a blob already in the content directory
    pub async fn create_attachment(
        &self,
        note_id: i64,
        filename: &str,
        original_name: &str,
        mime_type: &str,
        size: i64,
    ) -> Result<Attachment> {
        let now = Utc::now();

        let attachment = sqlx::query_as::<_, Attachment>(&format!(
            r#"
            INSERT INTO attachments (note_id, filename, original_name, mime_type, size, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            ATTACHMENT_COLUMNS
        ))
        .bind(note_id)
        .bind(filename)
        .bind(original_name)
        .bind(mime_type)
        .bind(size)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::NoteNotFound(note_id)
            } else {
                AppError::Database(e)
            }
        })?;

        tracing::debug!("Created attachment: {} for note: {}", attachment.id, note_id);
        Ok(attachment)
    }

    /// Get attachment metadata by ID
    pub async fn get_attachment(&self, id: i64) -> Result<Attachment> {
        sqlx::query_as::<_, Attachment>(&format!(
            "SELECT {} FROM attachments WHERE id = ?",
            ATTACHMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::AttachmentNotFound(id))
    }

    /// List attachments for a note, newest first
    pub async fn list_attachments(&self, note_id: i64) -> Result<Vec<Attachment>> {
        let attachments = sqlx::query_as::<_, Attachment>(&format!(
            "SELECT {} FROM attachments WHERE note_id = ? ORDER BY created_at DESC, id DESC",
            ATTACHMENT_COLUMNS
        ))
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attachments)
    }

    // ===== Sync (transaction scoped) =====

    /// Write the audit row that opens a reconciliation
    ///
    /// Being the first statement of the sync transaction, this takes the
    /// database write lock before any state is read. `server_time` is
    /// provisional until [`Repository::close_sync_log_tx`] stamps it.
    pub async fn open_sync_log_tx(
        conn: &mut SqliteConnection,
        device_id: &str,
        last_sync: DateTime<Utc>,
        server_time: DateTime<Utc>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO sync_log (device_id, last_sync, server_time) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(device_id)
        .bind(last_sync)
        .bind(server_time)
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    pub async fn close_sync_log_tx(
        conn: &mut SqliteConnection,
        log_id: i64,
        server_time: DateTime<Utc>,
        stats: &MergeStats,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sync_log
            SET server_time = ?, folders_inserted = ?, notes_inserted = ?,
                notes_updated = ?, notes_skipped = ?
            WHERE id = ?
            "#,
        )
        .bind(server_time)
        .bind(stats.folders_inserted)
        .bind(stats.notes_inserted)
        .bind(stats.notes_updated)
        .bind(stats.notes_skipped)
        .bind(log_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn folder_exists_tx(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM folders WHERE id = ?)")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(exists)
    }

    /// Insert a folder exactly as the client knows it, identifier included
    pub async fn insert_folder_verbatim_tx(conn: &mut SqliteConnection, folder: &Folder) -> Result<()> {
        sqlx::query("INSERT INTO folders (id, name, created_at) VALUES (?, ?, ?)")
            .bind(folder.id)
            .bind(&folder.name)
            .bind(folder.created_at)
            .execute(&mut *conn)
            .await
            .map_err(|e| folder_name_error(e, &folder.name))?;

        Ok(())
    }

    /// Stored `updated_at` of a note, `None` when the note is absent
    pub async fn note_updated_at_tx(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<Option<DateTime<Utc>>> {
        let updated_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT updated_at FROM notes WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(updated_at)
    }

    /// Insert a note exactly as the client knows it, identifier included
    pub async fn insert_note_verbatim_tx(conn: &mut SqliteConnection, note: &Note) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notes (id, title, content, folder_id, order_index, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(note.id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.folder_id)
        .bind(note.order_index)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| folder_reference_error(e, note.folder_id))?;

        Ok(())
    }

    /// Replace every client-owned field of a stored note; `created_at` is kept
    pub async fn overwrite_note_tx(conn: &mut SqliteConnection, note: &Note) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE notes
            SET title = ?, content = ?, folder_id = ?, order_index = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.folder_id)
        .bind(note.order_index)
        .bind(note.updated_at)
        .bind(note.id)
        .execute(&mut *conn)
        .await
        .map_err(|e| folder_reference_error(e, note.folder_id))?;

        Ok(())
    }

    pub async fn folders_created_since_tx(
        conn: &mut SqliteConnection,
        since: DateTime<Utc>,
    ) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {} FROM folders WHERE created_at > ? ORDER BY created_at ASC, id ASC",
            FOLDER_COLUMNS
        ))
        .bind(since)
        .fetch_all(&mut *conn)
        .await?;

        Ok(folders)
    }

    pub async fn notes_updated_since_tx(
        conn: &mut SqliteConnection,
        since: DateTime<Utc>,
    ) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(&format!(
            "SELECT {} FROM notes WHERE updated_at > ? ORDER BY updated_at ASC, id ASC",
            NOTE_COLUMNS
        ))
        .bind(since)
        .fetch_all(&mut *conn)
        .await?;

        Ok(notes)
    }

    pub async fn attachments_created_since_tx(
        conn: &mut SqliteConnection,
        since: DateTime<Utc>,
    ) -> Result<Vec<Attachment>> {
        let attachments = sqlx::query_as::<_, Attachment>(&format!(
            "SELECT {} FROM attachments WHERE created_at > ? ORDER BY created_at ASC, id ASC",
            ATTACHMENT_COLUMNS
        ))
        .bind(since)
        .fetch_all(&mut *conn)
        .await?;

        Ok(attachments)
    }

    /// Most recent committed reconciliations of a device, newest first
    pub async fn sync_history(&self, device_id: &str, limit: i64) -> Result<Vec<SyncLogEntry>> {
        let entries = sqlx::query_as::<_, SyncLogEntry>(
            r#"
            SELECT id, device_id, last_sync, server_time,
                   folders_inserted, notes_inserted, notes_updated, notes_skipped
            FROM sync_log
            WHERE device_id = ?
            ORDER BY server_time DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(device_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

fn validate_folder_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Folder name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Unique-name violations become a conflict, everything else stays a storage error
fn folder_name_error(err: sqlx::Error, name: &str) -> AppError {
    let unique_violation = matches!(
        &err,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation()
    );

    if unique_violation {
        AppError::FolderNameTaken(name.to_string())
    } else {
        AppError::Database(err)
    }
}

/// A note pointing at a folder that does not exist violates the foreign key
fn folder_reference_error(err: sqlx::Error, folder_id: Option<i64>) -> AppError {
    match folder_id {
        Some(id) if is_foreign_key_violation(&err) => AppError::FolderNotFound(id),
        _ => AppError::Database(err),
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}
