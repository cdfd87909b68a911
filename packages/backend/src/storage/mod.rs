//! Object storage for uploaded course files.
//!
//! Files live under `<course_id>/<epoch_ms>-<random7>.<ext>` in a single
//! bucket. The database row keeps that path so the object can be removed when
//! a moderator rejects the upload.

pub mod http;
pub mod local;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use rand::distr::Alphanumeric;
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{StorageBackend, StorageConfig};

pub use http::HttpObjectStorage;
pub use local::LocalObjectStorage;
pub use memory::MemoryObjectStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage not configured: {0}")]
    NotConfigured(&'static str),
    #[error("invalid object path: {0}")]
    InvalidPath(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("storage backend unavailable")]
    Unavailable,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores the object and returns its public URL.
    async fn put(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<String, StorageError>;

    /// Removing a missing object is not an error.
    async fn remove(&self, path: &str) -> Result<(), StorageError>;
}

pub fn build(config: &StorageConfig) -> Result<Arc<dyn ObjectStorage>, StorageError> {
    let storage: Arc<dyn ObjectStorage> = match config.backend {
        StorageBackend::Local => Arc::new(LocalObjectStorage::new(
            config.dir.clone(),
            config.public_url.clone(),
        )),
        StorageBackend::Http => Arc::new(HttpObjectStorage::new(
            config
                .api_url
                .clone()
                .ok_or(StorageError::NotConfigured("STORAGE_API_URL"))?,
            config
                .service_key
                .clone()
                .ok_or(StorageError::NotConfigured("STORAGE_SERVICE_KEY"))?,
            config.bucket.clone(),
        )),
        StorageBackend::Memory => Arc::new(MemoryObjectStorage::new()),
    };
    tracing::info!(backend = ?config.backend, bucket = %config.bucket, "Object storage ready");
    Ok(storage)
}

/// Fresh storage path for an upload to `course_id`.
pub fn object_path(course_id: Uuid, file_name: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(7)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!(
        "{}/{}-{}.{}",
        course_id,
        chrono::Utc::now().timestamp_millis(),
        suffix,
        file_extension(file_name)
    )
}

fn file_extension(file_name: &str) -> String {
    let ext = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase(),
        _ => String::new(),
    };
    if ext.is_empty() {
        "bin".to_string()
    } else {
        ext
    }
}

/// Rejects absolute paths and parent-directory segments.
pub(crate) fn checked_path(path: &str) -> Result<&str, StorageError> {
    if path.is_empty()
        || path.starts_with('/')
        || path.split('/').any(|segment| segment.is_empty() || segment == "..")
    {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(path)
}
