//! Notes service
//!
//! High-level business logic for notes operations.
//! Note deletion also releases the blobs of the attachments it cascaded.

use crate::database::{CreateNoteRequest, Note, NoteOrder, Repository, UpdateNoteRequest};
use crate::error::Result;
use crate::services::AttachmentsService;

/// Service for managing notes
#[derive(Clone)]
pub struct NotesService {
    repo: Repository,
    attachments: AttachmentsService,
}

impl NotesService {
    pub fn new(repo: Repository, attachments: AttachmentsService) -> Self {
        Self { repo, attachments }
    }

    /// Create a new note, unfiled or inside a folder
    pub async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        tracing::info!("Creating new note: {}", req.title);

        let note = self.repo.create_note(req).await?;

        tracing::info!("Note created successfully: {}", note.id);

        Ok(note)
    }

    /// Get a note by ID
    pub async fn get_note(&self, id: i64) -> Result<Note> {
        self.repo.get_note(id).await
    }

    /// List all notes
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        self.repo.list_notes().await
    }

    pub async fn list_notes_in_folder(&self, folder_id: i64) -> Result<Vec<Note>> {
        self.repo.list_notes_in_folder(folder_id).await
    }

    /// Update a note
    pub async fn update_note(&self, id: i64, req: UpdateNoteRequest) -> Result<Note> {
        tracing::debug!("Updating note: {}", id);

        let note = self.repo.update_note(id, req).await?;

        tracing::debug!("Note updated successfully: {}", note.id);

        Ok(note)
    }

    /// Delete a note and its attachments
    pub async fn delete_note(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting note: {}", id);

        let filenames = self.repo.delete_note(id).await?;
        self.attachments.remove_blobs(&filenames).await;

        tracing::info!("Note deleted successfully: {}", id);

        Ok(())
    }

    /// Apply explicit positions to the notes of one folder
    pub async fn reorder_notes(&self, folder_id: i64, order: &[NoteOrder]) -> Result<u64> {
        tracing::debug!("Reordering {} notes in folder {}", order.len(), folder_id);
        self.repo.reorder_notes(folder_id, order).await
    }
}
