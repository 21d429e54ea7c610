//! Attachment content directory
//!
//! Blobs live flat in one directory under server-generated names of the form
//! `{unix_seconds}_{32 hex chars}{.ext}`. The name is the only key; metadata
//! lives in the `attachments` table.

use crate::error::{AppError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Longest extension carried over from a client file name
const MAX_EXTENSION_LENGTH: usize = 16;

/// Directory-backed blob store keyed by generated filename
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a new blob store at the given root directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Initialize the blob store (create directory if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Blob store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Produce a fresh, collision-resistant name that keeps the original extension
    pub fn generate_filename(original_name: &str) -> String {
        let timestamp = chrono::Utc::now().timestamp();
        let random: [u8; 16] = rand::random();
        format!(
            "{}_{}{}",
            timestamp,
            hex::encode(random),
            extension_of(original_name)
        )
    }

    /// Write data under `filename`
    pub async fn write(&self, filename: &str, data: &[u8]) -> Result<()> {
        let path = self.path(filename)?;

        // Write to temp file first (atomic write)
        let temp_path = self.root.join(format!(".{}.tmp", filename));
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!("Wrote blob: {} ({} bytes)", filename, data.len());
        Ok(())
    }

    /// Read a blob, `None` when no file exists under that name
    pub async fn read(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(filename)?;

        match fs::read(&path).await {
            Ok(data) => {
                tracing::debug!("Read blob: {} ({} bytes)", filename, data.len());
                Ok(Some(data))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob; deleting a missing blob is not an error
    pub async fn delete(&self, filename: &str) -> Result<()> {
        let path = self.path(filename)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Deleted blob: {}", filename);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a stored filename to its path inside the root
    fn path(&self, filename: &str) -> Result<PathBuf> {
        let valid = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\', '\0']);

        if !valid {
            return Err(AppError::BlobStore(format!(
                "Invalid blob filename: {:?}",
                filename
            )));
        }

        Ok(self.root.join(filename))
    }

    /// Get blob store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Lowercased `.ext` of a client file name, or empty when it has none usable
fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LENGTH
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (BlobStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path().join("attachments"));
        store.initialize().await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (store, _temp) = create_test_store().await;

        let data = b"Hello, World!";
        store.write("1_abc.txt", data).await.unwrap();

        let read_data = store.read("1_abc.txt").await.unwrap().unwrap();
        assert_eq!(data, read_data.as_slice());
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let (store, _temp) = create_test_store().await;

        assert!(store.read("missing.bin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _temp) = create_test_store().await;

        store.write("2_def.png", b"png").await.unwrap();
        assert!(store.read("2_def.png").await.unwrap().is_some());

        store.delete("2_def.png").await.unwrap();
        assert!(store.read("2_def.png").await.unwrap().is_none());

        // Already gone
        store.delete("2_def.png").await.unwrap();
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let (store, _temp) = create_test_store().await;

        store.write("3_aaa", b"data").await.unwrap();

        let mut entries = fs::read_dir(store.root()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["3_aaa"]);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let (store, _temp) = create_test_store().await;

        for name in ["../escape", "a/b", "a\\b", "..", ""] {
            assert!(matches!(
                store.write(name, b"x").await,
                Err(AppError::BlobStore(_))
            ));
        }
    }

    #[test]
    fn test_generate_filename() {
        let name = BlobStore::generate_filename("Holiday Photo.JPG");
        let (timestamp, rest) = name.split_once('_').unwrap();

        assert!(timestamp.parse::<i64>().is_ok());
        assert!(rest.ends_with(".jpg"));
        let random = rest.trim_end_matches(".jpg");
        assert_eq!(random.len(), 32);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit()));

        assert_ne!(name, BlobStore::generate_filename("Holiday Photo.JPG"));
    }

    #[test]
    fn test_extension_handling() {
        assert_eq!(extension_of("report.pdf"), ".pdf");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of("weird.ex t"), "");
    }
}
