//! Operational audit trail.
//!
//! Separate from case status history: status events are part of the case
//! record, audit events describe who did what to the service.

mod channel;
mod events;
mod sqlite;
mod store;

pub use channel::{create_audit_system, AuditHandle, AuditWriter};
pub use events::{AuditEvent, AuditRecord};
pub use sqlite::SqliteAuditStore;
pub use store::{AuditError, AuditPage, AuditQuery, AuditStore, DEFAULT_PAGE_SIZE};
