use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use super::{checked_path, ObjectStorage, StorageError};

/// Bucket behind a REST object API (`/object/<bucket>/<path>`), authorized
/// with a service key.
pub struct HttpObjectStorage {
    client: reqwest::Client,
    api_url: String,
    service_key: String,
    bucket: String,
}

#[derive(Serialize)]
struct RemovePayload<'a> {
    prefixes: [&'a str; 1],
}

impl HttpObjectStorage {
    pub fn new(api_url: String, service_key: String, bucket: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            service_key,
            bucket,
        }
    }

    fn encoded(path: &str) -> String {
        path.split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.api_url,
            self.bucket,
            Self::encoded(path)
        )
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn put(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<String, StorageError> {
        let relative = checked_path(path)?;
        let url = format!("{}/object/{}/{}", self.api_url, self.bucket, Self::encoded(relative));

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::HttpStatus { status, body });
        }

        Ok(self.public_url(relative))
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let relative = checked_path(path)?;
        let url = format!("{}/object/{}", self.api_url, self.bucket);

        let resp = self
            .client
            .delete(&url)
            .bearer_auth(&self.service_key)
            .json(&RemovePayload {
                prefixes: [relative],
            })
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::HttpStatus { status, body });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_encodes_segments() {
        let storage = HttpObjectStorage::new(
            "https://storage.test/v1/".into(),
            "key".into(),
            "course-files".into(),
        );
        assert_eq!(
            storage.public_url("c1/1-ab cd.pdf"),
            "https://storage.test/v1/object/public/course-files/c1/1-ab%20cd.pdf"
        );
    }
}
