use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::case::{CaseStatus, FileLabel};
use crate::money::Money;

/// Something worth keeping a trail of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    CaseTransitioned {
        case_id: String,
        actor_id: String,
        /// Role the actor acted under
        role: String,
        from_status: CaseStatus,
        to_status: CaseStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    CaseCancelled {
        case_id: String,
        cancelled_by: String,
        previous_status: CaseStatus,
        /// Recorded as the case cost
        fee: Money,
        waived: bool,
    },
    FileAttached {
        case_id: String,
        uploaded_by: String,
        file_id: String,
        label: FileLabel,
        file_name: String,
    },

    BatchExported {
        requested_by: String,
        case_ids: Vec<String>,
        archive_name: String,
        entries_included: u32,
        /// Objects storage could not return
        entries_skipped: u32,
    },
    CasesReleasedToMilling {
        released_by: String,
        case_ids: Vec<String>,
    },
    ShippingBatchRecorded {
        batch_id: String,
        recorded_by: String,
        carrier: String,
        tracking_number: String,
        case_ids: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shipping_cost: Option<Money>,
    },
}

impl AuditEvent {
    /// Matches the serde tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::CaseTransitioned { .. } => "case_transitioned",
            Self::CaseCancelled { .. } => "case_cancelled",
            Self::FileAttached { .. } => "file_attached",
            Self::BatchExported { .. } => "batch_exported",
            Self::CasesReleasedToMilling { .. } => "cases_released_to_milling",
            Self::ShippingBatchRecorded { .. } => "shipping_batch_recorded",
        }
    }

    /// Every case the event touches; batch events touch several.
    pub fn case_ids(&self) -> Vec<&str> {
        match self {
            Self::CaseTransitioned { case_id, .. }
            | Self::CaseCancelled { case_id, .. }
            | Self::FileAttached { case_id, .. } => vec![case_id.as_str()],
            Self::BatchExported { case_ids, .. }
            | Self::CasesReleasedToMilling { case_ids, .. }
            | Self::ShippingBatchRecorded { case_ids, .. } => {
                case_ids.iter().map(String::as_str).collect()
            }
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => Vec::new(),
        }
    }

    /// The user behind the event. Service events have none.
    pub fn actor_id(&self) -> Option<&str> {
        match self {
            Self::CaseTransitioned { actor_id, .. } => Some(actor_id),
            Self::CaseCancelled { cancelled_by, .. } => Some(cancelled_by),
            Self::FileAttached { uploaded_by, .. } => Some(uploaded_by),
            Self::BatchExported { requested_by, .. } => Some(requested_by),
            Self::CasesReleasedToMilling { released_by, .. } => Some(released_by),
            Self::ShippingBatchRecorded { recorded_by, .. } => Some(recorded_by),
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
        }
    }
}

/// A persisted event as returned by `GET /audit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub event_type: String,
    pub actor_id: Option<String>,
    pub case_ids: Vec<String>,
    pub event: AuditEvent,
}

impl AuditRecord {
    pub fn new(id: i64, recorded_at: DateTime<Utc>, event: AuditEvent) -> Self {
        Self {
            id,
            recorded_at,
            event_type: event.event_type().to_string(),
            actor_id: event.actor_id().map(str::to_string),
            case_ids: event.case_ids().into_iter().map(str::to_string).collect(),
            event,
        }
    }
}
