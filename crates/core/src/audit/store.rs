use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{AuditEvent, AuditRecord};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Page size used when a query does not set one.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Search over the audit trail. Every set field must match.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    /// Matches events touching this case, including batch events.
    pub case_id: Option<String>,
    pub event_type: Option<String>,
    pub actor_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            case_id: None,
            event_type: None,
            actor_id: None,
            since: None,
            until: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_case(mut self, case_id: impl Into<String>) -> Self {
        self.case_id = Some(case_id.into());
        self
    }

    pub fn of_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn by_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn between(mut self, since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

/// One page of records, newest first, plus the number of matches overall.
#[derive(Debug, Clone)]
pub struct AuditPage {
    pub records: Vec<AuditRecord>,
    pub total: u64,
}

/// Persistence for the audit trail.
pub trait AuditStore: Send + Sync {
    /// Store an event, returning its id.
    fn append(&self, event: &AuditEvent, recorded_at: DateTime<Utc>) -> Result<i64, AuditError>;

    fn search(&self, query: &AuditQuery) -> Result<AuditPage, AuditError>;
}
