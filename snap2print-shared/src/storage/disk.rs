use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::{FilePayload, FileStore, StorageError, StorageKind};

/// URL prefix under which disk uploads are served
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Writes uploads into a local directory
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Creates the directory (and parents) if needed
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| StorageError::Io {
                path: root.clone(),
                source,
            })?;

        info!(dir = %root.display(), "Disk upload storage ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a `/uploads/{key}` reference back to its file
    pub fn path_for(&self, reference: &str) -> Option<PathBuf> {
        let key = reference
            .strip_prefix(UPLOADS_URL_PREFIX)?
            .strip_prefix('/')?;

        if key.is_empty() || key.contains('/') || key == ".." {
            return None;
        }
        Some(self.root.join(key))
    }
}

#[async_trait]
impl FileStore for DiskStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Disk
    }

    async fn put(&self, key: &str, payload: &FilePayload) -> Result<String, StorageError> {
        let path = self.root.join(key);
        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };

        // create_new: a key collision fails instead of overwriting another upload
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(io_err)?;

        file.write_all(&payload.bytes).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        Ok(format!("{UPLOADS_URL_PREFIX}/{key}"))
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        let metadata = tokio::fs::metadata(&self.root)
            .await
            .map_err(|e| StorageError::Unavailable(format!("{}: {e}", self.root.display())))?;

        if metadata.is_dir() {
            Ok(())
        } else {
            Err(StorageError::Unavailable(format!(
                "{} is not a directory",
                self.root.display()
            )))
        }
    }
}
