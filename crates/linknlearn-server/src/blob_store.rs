//! Disk-backed image storage.
//!
//! Uploaded images (profile photos, post pictures) are stored as opaque
//! files named by UUID under one base directory and served back publicly
//! by id. Paths are derived only from freshly generated UUIDs, and every
//! resolved path is checked to stay inside the base directory.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
    max_size: usize,
}

impl BlobStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ApiError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ApiError::Internal(format!(
                "Failed to create blob directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Store one image, returning its public id.
    pub async fn store(&self, data: &[u8]) -> Result<Uuid, ApiError> {
        if data.is_empty() {
            return Err(ApiError::BadRequest("Empty upload".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ApiError::BlobTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let id = Uuid::new_v4();
        let path = self.blob_path(&id)?;

        fs::write(&path, data)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to write blob {id}: {e}")))?;

        debug!(id = %id, size = data.len(), "Stored blob");
        Ok(id)
    }

    /// Read an image back by id.
    pub async fn get(&self, id: Uuid) -> Result<Vec<u8>, ApiError> {
        let path = self.blob_path(&id)?;

        if !path.exists() {
            return Err(ApiError::BlobNotFound(id));
        }

        let data = fs::read(&path)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to read blob {id}: {e}")))?;

        debug!(id = %id, size = data.len(), "Retrieved blob");
        Ok(data)
    }

    fn blob_path(&self, id: &Uuid) -> Result<PathBuf, ApiError> {
        let path = self.base_path.join(id.to_string());
        ensure_within(&self.base_path, &path)?;
        Ok(path)
    }
}

/// Reject any resolved path that escapes the base directory.
fn ensure_within(base: &Path, target: &Path) -> Result<(), ApiError> {
    for component in target.components() {
        if matches!(component, std::path::Component::ParentDir) {
            return Err(ApiError::BadRequest("Path traversal detected".to_string()));
        }
    }
    if !target.starts_with(base) {
        return Err(ApiError::BadRequest("Path traversal detected".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (BlobStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf(), 1024).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn store_and_get() {
        let (store, _dir) = test_store().await;
        let id = store.store(b"image-bytes").await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), b"image-bytes");
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let (store, _dir) = test_store().await;
        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(ApiError::BlobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_and_oversized_uploads_rejected() {
        let (store, _dir) = test_store().await;
        assert!(store.store(b"").await.is_err());
        assert!(matches!(
            store.store(&[0u8; 2048]).await,
            Err(ApiError::BlobTooLarge { .. })
        ));
    }
}
