use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

use super::{checked_path, ObjectStorage, StorageError};

/// Stores objects under a directory served at `public_url`.
pub struct LocalObjectStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: PathBuf, public_url: String) -> Self {
        Self {
            root,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(&self, path: &str, bytes: Bytes, _content_type: &str) -> Result<String, StorageError> {
        let relative = checked_path(path)?;
        let target = self.root.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &bytes).await?;
        tracing::debug!(path = relative, size = bytes.len(), "Stored object on disk");
        Ok(format!("{}/{}", self.public_url, relative))
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let relative = checked_path(path)?;
        match tokio::fs::remove_file(self.root.join(relative)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path().to_path_buf(), "http://cdn.test/files/".into());

        let url = storage
            .put("course/1-abcdefg.pdf", Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap();

        assert_eq!(url, "http://cdn.test/files/course/1-abcdefg.pdf");
        let written = std::fs::read(dir.path().join("course/1-abcdefg.pdf")).unwrap();
        assert_eq!(written, b"%PDF");
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path().to_path_buf(), "http://cdn.test".into());
        storage
            .put("c/2-xyz.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();

        storage.remove("c/2-xyz.png").await.unwrap();
        assert!(!dir.path().join("c/2-xyz.png").exists());
        storage.remove("c/2-xyz.png").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_paths_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path().to_path_buf(), "http://cdn.test".into());
        let err = storage
            .put("../escape.txt", Bytes::from_static(b"x"), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }
}
