//! Case repository traits.

use super::{
    Case, CaseError, CaseFile, Clinic, CreateCaseRequest, NewCaseFile, NewStatusEvent,
    StatusEvent, StoreError,
};

/// Work executed inside one repository transaction.
///
/// Returning `Err` rolls back every write made through the transaction.
pub type TransactionWork<'a> =
    &'a mut dyn FnMut(&mut dyn CaseTransaction) -> Result<(), CaseError>;

/// Reads and writes available inside a transaction.
///
/// Reads observe the transaction's own writes and the latest committed state.
pub trait CaseTransaction {
    fn get_case(&mut self, id: &str) -> Result<Option<Case>, StoreError>;

    fn list_files(&mut self, case_id: &str) -> Result<Vec<CaseFile>, StoreError>;

    /// Persist every mutable column of the case.
    fn update_case(&mut self, case: &Case) -> Result<(), StoreError>;

    fn insert_status_event(&mut self, event: &NewStatusEvent) -> Result<StatusEvent, StoreError>;
}

/// Trait for case storage backends.
pub trait CaseStore: Send + Sync {
    /// Get a case by ID.
    fn get_case(&self, id: &str) -> Result<Option<Case>, StoreError>;

    /// Get every case whose ID is listed. Missing IDs are simply absent from the result.
    fn get_cases_by_ids(&self, ids: &[String]) -> Result<Vec<Case>, StoreError>;

    /// Cases sharing a shipping batch ID, oldest first.
    fn find_cases_by_batch(&self, batch_id: &str) -> Result<Vec<Case>, StoreError>;

    fn get_clinic(&self, id: &str) -> Result<Option<Clinic>, StoreError>;

    /// Live files of a case, oldest first.
    fn list_files(&self, case_id: &str) -> Result<Vec<CaseFile>, StoreError>;

    /// Status history of a case in the order it happened.
    fn list_status_events(&self, case_id: &str) -> Result<Vec<StatusEvent>, StoreError>;

    fn insert_clinic(&self, clinic: &Clinic) -> Result<(), StoreError>;

    /// Create a case in `IN_DESIGN` / `DESIGN`.
    fn insert_case(&self, request: CreateCaseRequest) -> Result<Case, StoreError>;

    /// Store a file, retiring the live file of the same slot in the same transaction.
    ///
    /// Non-slot labels (rx, attachments) are appended.
    fn replace_file(&self, file: NewCaseFile) -> Result<CaseFile, StoreError>;

    /// Run `work` atomically. Everything it wrote is committed only if it returns `Ok`.
    fn with_transaction(&self, work: TransactionWork<'_>) -> Result<(), CaseError>;
}
