use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::guards;
use crate::audit::{AuditEvent, AuditHandle};
use crate::auth::Identity;
use crate::case::{
    Case, CaseError, CaseFile, CaseStage, CaseStatus, CaseStore, NewCaseFile, NewStatusEvent,
    StatusEvent,
};
use crate::metrics;
use crate::money::Money;
use crate::pricing::PriceTable;

/// Note recorded on status events written by a batch download.
pub const RELEASE_NOTE: &str = "Released to milling by batch download";

/// A requested status change.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub case_id: String,
    pub to: CaseStatus,
    pub actor: Identity,
    pub note: Option<String>,
    /// Only honoured for staff roles.
    pub waive_fee: bool,
}

/// Result of an accepted transition.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub case_id: String,
    pub from: CaseStatus,
    pub status: CaseStatus,
    pub stage: CaseStage,
    /// Present when the case was cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<Money>,
    pub at: DateTime<Utc>,
}

/// Move `case` to `to`, deriving stage and stamping the phase timestamp.
pub(crate) fn advance(case: &mut Case, to: CaseStatus, now: DateTime<Utc>) {
    case.status = to;
    if let Some(stage) = to.target_stage() {
        case.stage = stage;
    }
    match to {
        CaseStatus::ReadyForReview => case.designed_at = Some(now),
        CaseStatus::InMilling => case.milled_at = Some(now),
        CaseStatus::Shipped => case.shipped_at = Some(now),
        _ => {}
    }
    case.updated_at = now;
}

pub(crate) fn status_event(
    case_id: &str,
    from: CaseStatus,
    to: CaseStatus,
    note: Option<String>,
    actor_id: &str,
    at: DateTime<Utc>,
) -> NewStatusEvent {
    NewStatusEvent {
        case_id: case_id.to_string(),
        from,
        to,
        note,
        actor_id: actor_id.to_string(),
        created_at: at,
    }
}

/// Case state machine.
///
/// Every rule is evaluated inside the repository transaction against the
/// state read there, so concurrent requests on the same case serialize.
pub struct CaseLifecycle {
    store: Arc<dyn CaseStore>,
    pricing: PriceTable,
    audit: Option<AuditHandle>,
}

impl CaseLifecycle {
    pub fn new(store: Arc<dyn CaseStore>, pricing: PriceTable) -> Self {
        Self {
            store,
            pricing,
            audit: None,
        }
    }

    /// Set the audit handle for emitting events.
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn store(&self) -> &Arc<dyn CaseStore> {
        &self.store
    }

    pub fn pricing(&self) -> &PriceTable {
        &self.pricing
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }

    /// Validate and apply one status change.
    pub async fn request_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, CaseError> {
        let to = request.to;
        let result = self.apply_transition(&request);

        match &result {
            Ok(outcome) => {
                metrics::TRANSITIONS_TOTAL
                    .with_label_values(&[to.as_str(), "accepted"])
                    .inc();
                info!(
                    case_id = %outcome.case_id,
                    from = %outcome.from,
                    to = %outcome.status,
                    actor = %request.actor.user_id,
                    "Case transitioned"
                );
            }
            Err(e) => {
                metrics::TRANSITIONS_TOTAL
                    .with_label_values(&[to.as_str(), "rejected"])
                    .inc();
                debug!(case_id = %request.case_id, to = %to, error = %e, "Transition rejected");
            }
        }
        let outcome = result?;

        self.emit(AuditEvent::CaseTransitioned {
            case_id: outcome.case_id.clone(),
            actor_id: request.actor.user_id.clone(),
            role: request.actor.role.as_str().to_string(),
            from_status: outcome.from,
            to_status: outcome.status,
            note: request.note.clone(),
        })
        .await;

        if let Some(fee) = outcome.fee {
            metrics::CANCELLATION_FEE.observe(decimal_to_f64(fee));
            self.emit(AuditEvent::CaseCancelled {
                case_id: outcome.case_id.clone(),
                cancelled_by: request.actor.user_id.clone(),
                previous_status: outcome.from,
                fee,
                waived: request.waive_fee && request.actor.role.can_waive_fee(),
            })
            .await;
        }

        Ok(outcome)
    }

    fn apply_transition(&self, request: &TransitionRequest) -> Result<TransitionOutcome, CaseError> {
        let mut outcome = None;

        self.store.with_transaction(&mut |tx| {
            let mut case = tx
                .get_case(&request.case_id)?
                .ok_or_else(|| CaseError::NotFound(request.case_id.clone()))?;
            let files = tx.list_files(&case.id)?;

            guards::check_transition(&case, &files, request.to, &request.actor)?;

            let fee = if request.to == CaseStatus::Cancelled {
                Some(guards::cancellation_fee(
                    &case,
                    &files,
                    &request.actor,
                    request.waive_fee,
                    &self.pricing,
                )?)
            } else {
                None
            };

            let now = Utc::now();
            let from = case.status;
            advance(&mut case, request.to, now);
            if let Some(fee) = fee {
                case.cost = fee;
            }

            tx.update_case(&case)?;
            tx.insert_status_event(&status_event(
                &case.id,
                from,
                request.to,
                request.note.clone(),
                &request.actor.user_id,
                now,
            ))?;

            outcome = Some(TransitionOutcome {
                case_id: case.id.clone(),
                from,
                status: case.status,
                stage: case.stage,
                fee,
                at: now,
            });
            Ok(())
        })?;

        outcome.ok_or_else(|| CaseError::NotFound(request.case_id.clone()))
    }

    /// Advance every `APPROVED` case among `case_ids` to `IN_MILLING` in one transaction.
    ///
    /// Cases in any other status are left untouched. Returns the ids that moved.
    pub async fn release_to_milling(
        &self,
        case_ids: &[String],
        actor: &Identity,
    ) -> Result<Vec<String>, CaseError> {
        let mut released = Vec::new();

        self.store.with_transaction(&mut |tx| {
            released.clear();
            let now = Utc::now();
            for id in case_ids {
                let Some(mut case) = tx.get_case(id)? else {
                    continue;
                };
                if case.status != CaseStatus::Approved {
                    continue;
                }
                advance(&mut case, CaseStatus::InMilling, now);
                tx.update_case(&case)?;
                tx.insert_status_event(&status_event(
                    &case.id,
                    CaseStatus::Approved,
                    CaseStatus::InMilling,
                    Some(RELEASE_NOTE.to_string()),
                    &actor.user_id,
                    now,
                ))?;
                released.push(case.id);
            }
            Ok(())
        })?;

        if !released.is_empty() {
            metrics::CASES_RELEASED_TO_MILLING.inc_by(released.len() as u64);
            info!(count = released.len(), actor = %actor.user_id, "Cases released to milling");
            self.emit(AuditEvent::CasesReleasedToMilling {
                released_by: actor.user_id.clone(),
                case_ids: released.clone(),
            })
            .await;
        }

        Ok(released)
    }

    /// Store a new file on a case, retiring the previous file in the same slot.
    pub async fn attach_file(
        &self,
        actor: &Identity,
        file: NewCaseFile,
    ) -> Result<CaseFile, CaseError> {
        let case = self.case_for(&file.case_id, actor)?;
        if let Err(e) = guards::ensure_upload_allowed(&case, file.label) {
            warn!(case_id = %case.id, label = %file.label, "Upload rejected: {}", e);
            return Err(e);
        }

        let stored = self.store.replace_file(file)?;
        metrics::FILES_ATTACHED
            .with_label_values(&[stored.label.as_str()])
            .inc();
        debug!(case_id = %stored.case_id, label = %stored.label, key = %stored.key, "File attached");

        self.emit(AuditEvent::FileAttached {
            case_id: stored.case_id.clone(),
            uploaded_by: actor.user_id.clone(),
            file_id: stored.id.clone(),
            label: stored.label,
            file_name: stored.file_name.clone(),
        })
        .await;

        Ok(stored)
    }

    /// Load a case the actor is allowed to see.
    pub fn case_for(&self, case_id: &str, actor: &Identity) -> Result<Case, CaseError> {
        let case = self
            .store
            .get_case(case_id)?
            .ok_or_else(|| CaseError::NotFound(case_id.to_string()))?;
        guards::ensure_access(&case, actor)?;
        Ok(case)
    }

    /// Status history of a case the actor is allowed to see.
    pub fn history(&self, case_id: &str, actor: &Identity) -> Result<Vec<StatusEvent>, CaseError> {
        let case = self.case_for(case_id, actor)?;
        Ok(self.store.list_status_events(&case.id)?)
    }
}

fn decimal_to_f64(money: Money) -> f64 {
    money.amount().to_f64().unwrap_or(0.0)
}
