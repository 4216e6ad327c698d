//! Trait definitions for object storage.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use super::StorageError;

/// Stream of object content chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, StorageError>> + Send>>;

/// A keyed blob store holding case files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns the name of this backend.
    fn name(&self) -> &str;

    /// Open an object for streaming.
    ///
    /// Fails with [`StorageError::NotFound`] when the key does not exist.
    async fn get_object(&self, key: &str) -> Result<ByteStream, StorageError>;

    /// Write a whole object, replacing any previous content under `key`.
    async fn put_object(
        &self,
        bytes: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> Result<(), StorageError>;
}

/// Drain a byte stream into one buffer.
pub async fn collect_bytes(mut stream: ByteStream) -> Result<Vec<u8>, StorageError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_collect_bytes_concatenates_chunks() {
        let chunks: Vec<Result<Vec<u8>, StorageError>> =
            vec![Ok(b"ab".to_vec()), Ok(b"cd".to_vec())];
        let stream: ByteStream = Box::pin(stream::iter(chunks));
        assert_eq!(collect_bytes(stream).await.unwrap(), b"abcd".to_vec());
    }

    #[tokio::test]
    async fn test_collect_bytes_propagates_error() {
        let chunks: Vec<Result<Vec<u8>, StorageError>> = vec![
            Ok(b"ab".to_vec()),
            Err(StorageError::Request("connection reset".to_string())),
        ];
        let stream: ByteStream = Box::pin(stream::iter(chunks));
        assert!(collect_bytes(stream).await.is_err());
    }
}
