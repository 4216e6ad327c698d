//! Object storage for case files.
//!
//! Case artifacts live in a blob store addressed by string keys. The
//! [`ObjectStore`] trait streams objects out and writes whole objects in;
//! [`FsObjectStore`] keeps them under a local directory and
//! [`HttpObjectStore`] talks to a remote bucket gateway.

mod error;
mod fs;
mod http;
mod traits;

pub use error::StorageError;
pub use fs::FsObjectStore;
pub use http::HttpObjectStore;
pub use traits::{collect_bytes, ByteStream, ObjectStore};

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};

/// Build the object store selected by configuration.
pub fn create_object_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    match config.backend {
        StorageBackend::Fs => {
            let fs = config.fs.as_ref().ok_or_else(|| {
                StorageError::Config("storage.fs section is required for the fs backend".to_string())
            })?;
            Ok(Arc::new(FsObjectStore::new(&fs.root)))
        }
        StorageBackend::Http => {
            let http = config.http.as_ref().ok_or_else(|| {
                StorageError::Config(
                    "storage.http section is required for the http backend".to_string(),
                )
            })?;
            Ok(Arc::new(HttpObjectStore::new(http.clone())?))
        }
    }
}
