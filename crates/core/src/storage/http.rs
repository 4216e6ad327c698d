//! HTTP object store client.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, StatusCode};
use tracing::debug;

use super::{ByteStream, ObjectStore, StorageError};
use crate::config::HttpStorageConfig;

/// Object store backed by a bucket gateway speaking plain GET/PUT.
///
/// Objects are addressed as `{base_url}/{url-encoded key}`.
pub struct HttpObjectStore {
    client: Client,
    config: HttpStorageConfig,
}

impl HttpObjectStore {
    pub fn new(config: HttpStorageConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StorageError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(key)
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn request_error(e: reqwest::Error) -> StorageError {
    if e.is_timeout() {
        StorageError::Timeout
    } else {
        StorageError::Request(e.to_string())
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn get_object(&self, key: &str) -> Result<ByteStream, StorageError> {
        let url = self.object_url(key);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(request_error)?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(StorageError::NotFound(key.to_string())),
            status => {
                return Err(StorageError::Status {
                    key: key.to_string(),
                    status: status.as_u16(),
                })
            }
        }

        debug!(key = %key, "Streaming object");

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(request_error));
        Ok(Box::pin(body))
    }

    async fn put_object(
        &self,
        bytes: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let url = self.object_url(key);
        let response = self
            .authorize(self.client.put(&url))
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(StorageError::Status {
                key: key.to_string(),
                status: response.status().as_u16(),
            });
        }

        debug!(key = %key, "Stored object");
        Ok(())
    }
}
