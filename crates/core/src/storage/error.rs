use thiserror::Error;

/// Errors from object storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("I/O error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Request for {key} failed with status {status}")]
    Status { key: String, status: u16 },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Storage timed out")]
    Timeout,

    #[error("Storage misconfigured: {0}")]
    Config(String),
}

impl StorageError {
    pub(crate) fn io(key: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Io {
                key: key.to_string(),
                source,
            }
        }
    }
}
