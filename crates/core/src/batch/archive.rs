//! In-memory zip assembly.

use std::io::{Cursor, Write};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::selector::{ExportEntry, ExportPlan};
use crate::case::CaseError;
use crate::metrics;
use crate::storage::{collect_bytes, ObjectStore, StorageError};

/// A finished archive held in memory.
#[derive(Debug, Clone)]
pub struct Archive {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Entries written, in plan order.
    pub included: Vec<ExportEntry>,
    /// Entries whose object could not be fetched.
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    pub key: String,
    pub path: String,
    pub reason: String,
}

/// Fetches every planned object and packs it into one deflated zip.
///
/// Fetches run concurrently but entries are written in plan order. A failed
/// fetch skips that entry and the archive is finalized regardless, possibly empty.
pub struct ArchiveBuilder {
    store: Arc<dyn ObjectStore>,
    concurrency: usize,
}

impl ArchiveBuilder {
    pub fn new(store: Arc<dyn ObjectStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let result = match self.store.get_object(key).await {
            Ok(stream) => collect_bytes(stream).await,
            Err(e) => Err(e),
        };
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::STORAGE_REQUESTS
            .with_label_values(&[self.store.name(), "get", status])
            .inc();
        result
    }

    pub async fn build(&self, plan: &ExportPlan) -> Result<Archive, CaseError> {
        let fetched: Vec<(&ExportEntry, Result<Vec<u8>, StorageError>)> =
            stream::iter(plan.entries.iter())
                .map(|entry| async move { (entry, self.fetch(&entry.key).await) })
                .buffered(self.concurrency)
                .boxed()
                .collect()
                .await;

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let mut included = Vec::new();
        let mut skipped = Vec::new();

        for (entry, result) in fetched {
            match result {
                Ok(bytes) => {
                    zip.start_file(entry.path.as_str(), options)
                        .map_err(|e| CaseError::Archive(e.to_string()))?;
                    zip.write_all(&bytes)
                        .map_err(|e| CaseError::Archive(e.to_string()))?;
                    debug!(key = %entry.key, path = %entry.path, size = bytes.len(), "Archive entry written");
                    included.push(entry.clone());
                }
                Err(e) => {
                    warn!(key = %entry.key, case_id = %entry.case_id, error = %e, "Skipping archive entry");
                    skipped.push(SkippedEntry {
                        key: entry.key.clone(),
                        path: entry.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        metrics::ARCHIVE_ENTRIES
            .with_label_values(&["included"])
            .inc_by(included.len() as u64);
        metrics::ARCHIVE_ENTRIES
            .with_label_values(&["skipped"])
            .inc_by(skipped.len() as u64);

        let bytes = zip
            .finish()
            .map_err(|e| CaseError::Archive(e.to_string()))?
            .into_inner();

        Ok(Archive {
            file_name: plan.archive_name(),
            bytes,
            included,
            skipped,
        })
    }
}
