//! File system object store.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use futures::stream;
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::{ByteStream, ObjectStore, StorageError};

const CHUNK_SIZE: usize = 64 * 1024;

/// Object store keeping every object as a file under a root directory.
///
/// Keys map to relative paths (`cases/abc/model_top.stl`). Keys that would
/// escape the root are rejected.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn name(&self) -> &str {
        "fs"
    }

    async fn get_object(&self, key: &str) -> Result<ByteStream, StorageError> {
        let path = self.resolve(key)?;
        let file = File::open(&path)
            .await
            .map_err(|e| StorageError::io(key, e))?;

        debug!(key = %key, path = %path.display(), "Opened object");

        let key = key.to_string();
        let chunks = stream::try_unfold(file, move |mut file| {
            let key = key.clone();
            async move {
                let mut buffer = vec![0u8; CHUNK_SIZE];
                let read = file
                    .read(&mut buffer)
                    .await
                    .map_err(|e| StorageError::io(&key, e))?;
                if read == 0 {
                    return Ok(None);
                }
                buffer.truncate(read);
                Ok(Some((buffer, file)))
            }
        });

        Ok(Box::pin(chunks))
    }

    async fn put_object(
        &self,
        bytes: Vec<u8>,
        key: &str,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(key, e))?;
        }
        fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::io(key, e))?;

        debug!(key = %key, path = %path.display(), "Stored object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::collect_bytes;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());

        store
            .put_object(b"solid".to_vec(), "cases/c1/top.stl", "model/stl")
            .await
            .unwrap();

        let stream = store.get_object("cases/c1/top.stl").await.unwrap();
        assert_eq!(collect_bytes(stream).await.unwrap(), b"solid".to_vec());
    }

    #[tokio::test]
    async fn test_large_object_streams_in_chunks() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());
        let content = vec![7u8; CHUNK_SIZE * 2 + 10];

        store
            .put_object(content.clone(), "big.bin", "application/octet-stream")
            .await
            .unwrap();

        let stream = store.get_object("big.bin").await.unwrap();
        assert_eq!(collect_bytes(stream).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());

        let result = store.get_object("nope.stl").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_escaping_keys_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());

        for key in ["../secret", "/etc/passwd", "a/../../b", ""] {
            let result = store.get_object(key).await;
            assert!(
                matches!(result, Err(StorageError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }
}
