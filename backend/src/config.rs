//! Server configuration
//!
//! Central location for configuration constants, resource limits and the
//! environment-driven `ServerConfig` used at startup.

use crate::error::{AppError, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

// ===== Storage Layout =====

/// Database file name inside the data directory
pub const DATABASE_FILE_NAME: &str = "notes.db";

/// Attachment content directory inside the data directory
pub const ATTACHMENTS_DIR_NAME: &str = "attachments";

/// Folders created on first startup when the folders table is empty
pub const DEFAULT_FOLDERS: &[&str] = &["Notes", "Work", "Personal"];

// ===== Attachment Limits =====

/// Maximum accepted attachment size in bytes (10 MiB)
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// Extra request body allowance on top of the attachment limit for multipart framing
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Maximum length kept from a client-supplied file name
pub const MAX_ORIGINAL_NAME_LENGTH: usize = 255;

/// MIME type recorded when the upload does not declare one
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

// ===== Sync =====

/// Number of reconciliations returned by the per-device history query
pub const SYNC_HISTORY_LIMIT: i64 = 50;

// ===== Environment =====

pub const ENV_BIND_ADDR: &str = "NOTESYNC_BIND_ADDR";
pub const ENV_DATA_DIR: &str = "NOTESYNC_DATA_DIR";
pub const ENV_MAX_ATTACHMENT_BYTES: &str = "NOTESYNC_MAX_ATTACHMENT_BYTES";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DATA_DIR: &str = "data";

/// Runtime configuration for the server process
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub max_attachment_bytes: usize,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup(ENV_BIND_ADDR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("{}: {}", ENV_BIND_ADDR, e)))?;

        let data_dir = lookup(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let max_attachment_bytes = match lookup(ENV_MAX_ATTACHMENT_BYTES) {
            Some(raw) => {
                let value = raw
                    .trim()
                    .parse::<usize>()
                    .map_err(|e| AppError::Config(format!("{}: {}", ENV_MAX_ATTACHMENT_BYTES, e)))?;
                if value == 0 {
                    return Err(AppError::Config(format!(
                        "{} must be greater than zero",
                        ENV_MAX_ATTACHMENT_BYTES
                    )));
                }
                value
            }
            None => DEFAULT_MAX_ATTACHMENT_BYTES,
        };

        Ok(Self {
            bind_addr,
            data_dir,
            max_attachment_bytes,
        })
    }

    /// Location of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE_NAME)
    }

    /// Location of the attachment content directory
    pub fn attachments_dir(&self) -> PathBuf {
        self.data_dir.join(ATTACHMENTS_DIR_NAME)
    }
}
