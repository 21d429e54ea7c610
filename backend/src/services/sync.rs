//! Sync service
//!
//! Reconciles a device's offline snapshot with the server copy.
//!
//! One reconciliation is one transaction:
//! 1. open an audit row in `sync_log` (takes the write lock)
//! 2. insert folders the server does not know yet, by client id
//! 3. merge notes last-write-wins on `updated_at`
//! 4. collect everything changed after the client's `last_sync`
//! 5. close the audit row with the merge counts and commit
//!
//! Any error drops the transaction, so nothing of a failed merge persists.

use crate::config::SYNC_HISTORY_LIMIT;
use crate::database::{
    Attachment, Folder, MergeStats, Note, Repository, SyncLogEntry, SyncResponse,
};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

/// Outcome of a committed reconciliation
#[derive(Debug, Clone)]
pub struct SyncDelta {
    pub folders: Vec<Folder>,
    pub notes: Vec<Note>,
    pub attachments: Vec<Attachment>,
    /// Instant the reconciliation took the write lock; the client's next `last_sync`
    pub server_time: DateTime<Utc>,
    pub stats: MergeStats,
}

impl SyncDelta {
    pub fn summary(&self) -> String {
        format!(
            "Synced {} notes, {} folders, {} attachments",
            self.notes.len(),
            self.folders.len(),
            self.attachments.len()
        )
    }

    pub fn into_response(self) -> SyncResponse {
        let message = self.summary();
        SyncResponse {
            notes: self.notes,
            folders: self.folders,
            attachments: self.attachments,
            server_time: self.server_time,
            success: true,
            message,
        }
    }
}

/// Service for device synchronization
#[derive(Clone)]
pub struct SyncService {
    repo: Repository,
}

impl SyncService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Merge a device snapshot and return the server delta since `last_sync`
    pub async fn reconcile(
        &self,
        device_id: &str,
        last_sync: DateTime<Utc>,
        local_folders: &[Folder],
        local_notes: &[Note],
    ) -> Result<SyncDelta> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(AppError::Validation("device_id is required".to_string()));
        }

        tracing::info!(
            "Sync request from device: {}, last sync: {} ({} folders, {} notes)",
            device_id,
            last_sync,
            local_folders.len(),
            local_notes.len()
        );

        let mut tx = self.repo.begin().await?;

        let merged = merge(
            &mut *tx,
            device_id,
            last_sync,
            local_folders,
            local_notes,
        )
        .await;

        let delta = match merged {
            Ok(delta) => delta,
            Err(e) => {
                tracing::warn!("Sync for device {} rolled back: {}", device_id, e);
                return Err(e);
            }
        };

        tx.commit().await?;

        tracing::info!(
            "Sync completed for device: {} - {} (folders +{} ={}, notes +{} ~{} ={})",
            device_id,
            delta.summary(),
            delta.stats.folders_inserted,
            delta.stats.folders_existing,
            delta.stats.notes_inserted,
            delta.stats.notes_updated,
            delta.stats.notes_skipped
        );

        Ok(delta)
    }

    /// Recent committed reconciliations of one device
    pub async fn history(&self, device_id: &str) -> Result<Vec<SyncLogEntry>> {
        self.repo
            .sync_history(device_id.trim(), SYNC_HISTORY_LIMIT)
            .await
    }
}

async fn merge(
    conn: &mut SqliteConnection,
    device_id: &str,
    last_sync: DateTime<Utc>,
    local_folders: &[Folder],
    local_notes: &[Note],
) -> Result<SyncDelta> {
    let log_id = Repository::open_sync_log_tx(conn, device_id, last_sync, Utc::now()).await?;

    // Taken under the write lock; writes that held it earlier are visible below
    let server_time = Utc::now();
    let mut stats = MergeStats::default();

    // Folders first so incoming notes can reference them
    for folder in local_folders {
        if Repository::folder_exists_tx(conn, folder.id).await? {
            stats.folders_existing += 1;
        } else {
            Repository::insert_folder_verbatim_tx(conn, folder).await?;
            stats.folders_inserted += 1;
        }
    }

    for note in local_notes {
        match Repository::note_updated_at_tx(conn, note.id).await? {
            None => {
                Repository::insert_note_verbatim_tx(conn, note).await?;
                stats.notes_inserted += 1;
            }
            Some(stored) if note.updated_at > stored => {
                Repository::overwrite_note_tx(conn, note).await?;
                stats.notes_updated += 1;
            }
            Some(_) => stats.notes_skipped += 1,
        }
    }

    let folders = Repository::folders_created_since_tx(conn, last_sync).await?;
    let notes = Repository::notes_updated_since_tx(conn, last_sync).await?;
    let attachments = Repository::attachments_created_since_tx(conn, last_sync).await?;

    Repository::close_sync_log_tx(conn, log_id, server_time, &stats).await?;

    Ok(SyncDelta {
        folders,
        notes,
        attachments,
        server_time,
        stats,
    })
}
