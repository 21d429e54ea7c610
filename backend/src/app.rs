//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available to the HTTP
//! handlers through axum state.

use crate::config::ServerConfig;
use crate::database::{close_pool, create_pool, Repository};
use crate::error::Result;
use crate::services::{AttachmentsService, NotesService, SyncService};
use crate::storage::BlobStore;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub db: Repository,
    pub notes_service: NotesService,
    pub attachments_service: AttachmentsService,
    pub sync_service: SyncService,
}

impl AppState {
    /// Open the database and content directory and wire the services
    pub async fn initialize(config: ServerConfig) -> Result<Self> {
        tracing::info!("Initializing application");
        tracing::info!("Data directory: {:?}", config.data_dir);

        std::fs::create_dir_all(&config.data_dir)?;

        let pool = create_pool(&config.database_path()).await?;
        let db = Repository::new(pool);

        let blob_store = BlobStore::new(config.attachments_dir());
        blob_store.initialize().await?;

        let attachments_service =
            AttachmentsService::new(db.clone(), blob_store, config.max_attachment_bytes);
        let notes_service = NotesService::new(db.clone(), attachments_service.clone());
        let sync_service = SyncService::new(db.clone());

        tracing::info!("Application initialized successfully");

        Ok(Self {
            db,
            notes_service,
            attachments_service,
            sync_service,
        })
    }

    /// Release the database; call once the server has stopped accepting requests
    pub async fn close(&self) {
        close_pool(self.db.pool()).await;
    }
}
