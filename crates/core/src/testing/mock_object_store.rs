//! Mock object store for testing.

use async_trait::async_trait;
use futures::stream;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::storage::{ByteStream, ObjectStore, StorageError};

/// A recorded write for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub key: String,
    pub content_type: String,
    pub size: usize,
}

/// In-memory implementation of the ObjectStore trait.
///
/// Provides controllable behavior for testing:
/// - Seed objects by key
/// - Make individual keys fail with a request error
/// - Record every key that was read
///
/// # Example
///
/// ```rust,ignore
/// use labflow_core::testing::MockObjectStore;
///
/// let store = MockObjectStore::new();
/// store.insert("cases/c1/top.stl", b"solid".to_vec()).await;
/// store.fail_key("cases/c1/rx.pdf").await;
///
/// // Build an archive...
///
/// assert_eq!(store.recorded_gets().await.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockObjectStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    gets: Arc<RwLock<Vec<String>>>,
    puts: Arc<RwLock<Vec<RecordedPut>>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object.
    pub async fn insert(&self, key: &str, bytes: Vec<u8>) {
        self.objects.write().await.insert(key.to_string(), bytes);
    }

    /// Make reads of `key` fail even if the object exists.
    pub async fn fail_key(&self, key: &str) {
        self.failing.write().await.insert(key.to_string());
    }

    /// Current content of an object.
    pub async fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    /// Keys requested through `get_object`, in call order.
    pub async fn recorded_gets(&self) -> Vec<String> {
        self.gets.read().await.clone()
    }

    pub async fn recorded_puts(&self) -> Vec<RecordedPut> {
        self.puts.read().await.clone()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_object(&self, key: &str) -> Result<ByteStream, StorageError> {
        self.gets.write().await.push(key.to_string());

        if self.failing.read().await.contains(key) {
            return Err(StorageError::Request(format!("simulated failure for {}", key)));
        }

        let bytes = self
            .objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        // Split into two chunks so consumers exercise chunk handling
        let mid = bytes.len() / 2;
        let chunks: Vec<Result<Vec<u8>, StorageError>> =
            vec![Ok(bytes[..mid].to_vec()), Ok(bytes[mid..].to_vec())];
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn put_object(
        &self,
        bytes: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.puts.write().await.push(RecordedPut {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
        });
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::collect_bytes;

    #[tokio::test]
    async fn test_round_trip_and_recording() {
        let store = MockObjectStore::new();
        store
            .put_object(b"solid part".to_vec(), "cases/c1/top.stl", "model/stl")
            .await
            .unwrap();

        let stream = store.get_object("cases/c1/top.stl").await.unwrap();
        assert_eq!(collect_bytes(stream).await.unwrap(), b"solid part".to_vec());
        assert_eq!(store.recorded_gets().await, vec!["cases/c1/top.stl"]);
        assert_eq!(store.recorded_puts().await[0].content_type, "model/stl");
    }

    #[tokio::test]
    async fn test_missing_and_failing_keys() {
        let store = MockObjectStore::new();
        store.insert("present", b"x".to_vec()).await;
        store.fail_key("present").await;

        assert!(matches!(
            store.get_object("absent").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.get_object("present").await,
            Err(StorageError::Request(_))
        ));
    }
}
