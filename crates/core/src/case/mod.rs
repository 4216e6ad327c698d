//! Case records, their files and status history.

mod error;
mod sqlite_store;
mod store;
mod types;

pub use error::{CaseError, ErrorKind, StoreError};
pub use sqlite_store::SqliteCaseStore;
pub use store::{CaseStore, CaseTransaction, TransactionWork};
pub use types::{
    Address, Case, CaseFile, CaseStage, CaseStatus, Clinic, CreateCaseRequest, FileLabel,
    Material, NewCaseFile, NewStatusEvent, ParseEnumError, Patient, ProductType, Shipment,
    StatusEvent, REQUIRED_FOR_APPROVAL,
};
