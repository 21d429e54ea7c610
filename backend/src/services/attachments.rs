//! Attachments service
//!
//! Handles file uploads attached to notes.
//! Integrates Repository and BlobStore: the blob is written first, then the
//! metadata row, and a failed row insert removes the blob again.

use crate::config::{DEFAULT_MIME_TYPE, MAX_ORIGINAL_NAME_LENGTH};
use crate::database::{Attachment, Repository};
use crate::error::{AppError, Result};
use crate::storage::BlobStore;

/// Service for managing attachments
#[derive(Clone)]
pub struct AttachmentsService {
    repo: Repository,
    blob_store: BlobStore,
    max_bytes: usize,
}

impl AttachmentsService {
    pub fn new(repo: Repository, blob_store: BlobStore, max_bytes: usize) -> Self {
        Self {
            repo,
            blob_store,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Create an attachment from binary data
    pub async fn create_attachment(
        &self,
        note_id: i64,
        original_name: &str,
        mime_type: Option<&str>,
        data: &[u8],
    ) -> Result<Attachment> {
        tracing::info!(
            "Creating attachment: {} for note: {} (size: {} bytes)",
            original_name,
            note_id,
            data.len()
        );

        if !self.repo.note_exists(note_id).await? {
            return Err(AppError::NoteNotFound(note_id));
        }

        if data.len() > self.max_bytes {
            return Err(AppError::Validation(format!(
                "File too large: {} bytes exceeds the {} byte limit",
                data.len(),
                self.max_bytes
            )));
        }

        // Validate filename (prevent path traversal)
        let safe_name = sanitize_filename(original_name);
        if safe_name.is_empty() {
            return Err(AppError::Validation("File name is required".to_string()));
        }

        let mime_type = mime_type
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE);

        let filename = BlobStore::generate_filename(&safe_name);
        self.blob_store.write(&filename, data).await?;

        let attachment = match self
            .repo
            .create_attachment(note_id, &filename, &safe_name, mime_type, data.len() as i64)
            .await
        {
            Ok(attachment) => attachment,
            Err(e) => {
                if let Err(cleanup) = self.blob_store.delete(&filename).await {
                    tracing::warn!("Failed to remove orphaned blob {}: {}", filename, cleanup);
                }
                return Err(e);
            }
        };

        tracing::info!("Attachment created: {} ({})", attachment.id, filename);

        Ok(attachment)
    }

    /// Get attachment metadata and its bytes
    pub async fn read_attachment(&self, id: i64) -> Result<(Attachment, Vec<u8>)> {
        let attachment = self.repo.get_attachment(id).await?;

        match self.blob_store.read(&attachment.filename).await? {
            Some(data) => Ok((attachment, data)),
            None => {
                tracing::warn!(
                    "Attachment {} has no blob on disk: {}",
                    id,
                    attachment.filename
                );
                Err(AppError::BlobMissing {
                    id,
                    filename: attachment.filename,
                })
            }
        }
    }

    /// List attachments for a note
    pub async fn list_attachments(&self, note_id: i64) -> Result<Vec<Attachment>> {
        if !self.repo.note_exists(note_id).await? {
            return Err(AppError::NoteNotFound(note_id));
        }
        self.repo.list_attachments(note_id).await
    }

    /// Best-effort removal of blobs whose rows are already gone
    pub async fn remove_blobs(&self, filenames: &[String]) {
        for filename in filenames {
            if let Err(e) = self.blob_store.delete(filename).await {
                tracing::warn!("Failed to remove blob {}: {}", filename, e);
            }
        }
    }
}

/// Sanitize filename to prevent path traversal attacks
fn sanitize_filename(filename: &str) -> String {
    // Remove path separators and null bytes
    filename
        .chars()
        .filter(|c| *c != '/' && *c != '\\' && *c != '\0')
        .take(MAX_ORIGINAL_NAME_LENGTH)
        .collect::<String>()
        .trim()
        .to_string()
}
