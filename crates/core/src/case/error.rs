//! Error types for case workflow operations.

use thiserror::Error;

use super::{CaseStatus, FileLabel};
use crate::pricing::PricingError;
use crate::storage::StorageError;

/// Persistence failure inside the case repository.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Coarse classification used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    Permission,
    NotFound,
    Validation,
    Guard,
    Storage,
    Transaction,
}

/// Errors produced by lifecycle, batch export and shipping operations.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Case not found: {0}")]
    NotFound(String),

    #[error("Shipping batch not found: {0}")]
    BatchNotFound(String),

    #[error("Cases not found: {}", .0.join(", "))]
    CasesNotFound(Vec<String>),

    #[error("Invalid request: {0}")]
    Validation(String),

    /// Transition rejected by a workflow rule.
    #[error("Cannot move case {case_id} from {from} to {to}: {reason}")]
    InvalidTransition {
        case_id: String,
        from: CaseStatus,
        to: CaseStatus,
        reason: String,
    },

    #[error("Missing required files: {}", join_labels(.missing))]
    MissingRequiredFiles { missing: Vec<FileLabel> },

    #[error("Cannot upload {label} while case is in stage {stage}")]
    UploadNotAllowed { label: FileLabel, stage: String },

    #[error("No production files found for the selected cases")]
    NoProductionFiles,

    #[error("Shipping batch rejected: cases not in milling: {}", .case_ids.join(", "))]
    ShippingRejected { case_ids: Vec<String> },

    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn join_labels(labels: &[FileLabel]) -> String {
    labels
        .iter()
        .map(FileLabel::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl CaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaseError::Unauthorized(_) => ErrorKind::Auth,
            CaseError::Forbidden(_) => ErrorKind::Permission,
            CaseError::NotFound(_) | CaseError::CasesNotFound(_) | CaseError::BatchNotFound(_) => {
                ErrorKind::NotFound
            }
            CaseError::NoProductionFiles => ErrorKind::NotFound,
            CaseError::Validation(_) => ErrorKind::Validation,
            CaseError::InvalidTransition { .. }
            | CaseError::MissingRequiredFiles { .. }
            | CaseError::UploadNotAllowed { .. }
            | CaseError::ShippingRejected { .. }
            | CaseError::Pricing(_) => ErrorKind::Guard,
            CaseError::Storage(_) => ErrorKind::Storage,
            CaseError::Store(_) | CaseError::Archive(_) => ErrorKind::Transaction,
        }
    }

    /// Message safe to return to callers.
    ///
    /// Infrastructure failures are reduced to a generic line; the detail is
    /// expected to be logged by whoever handles the error.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Storage => "File storage is unavailable".to_string(),
            ErrorKind::Transaction => "The operation could not be completed".to_string(),
            _ => self.to_string(),
        }
    }
}
