//! Shipping batches.
//!
//! A batch is not stored on its own: it is the set of cases carrying the same
//! shipping batch id, written together when the batch is recorded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::audit::{AuditEvent, AuditHandle};
use crate::auth::Identity;
use crate::batch::dedupe_ids;
use crate::case::{CaseError, CaseStatus, CaseStore, Shipment};
use crate::lifecycle::{advance, status_event};
use crate::metrics;
use crate::money::Money;

#[derive(Debug, Clone)]
pub struct ShipRequest {
    pub case_ids: Vec<String>,
    pub carrier: String,
    pub tracking_number: String,
    pub shipping_cost: Option<Money>,
    pub actor: Identity,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShipOutcome {
    pub batch_id: String,
    pub case_ids: Vec<String>,
    pub shipped_at: DateTime<Utc>,
}

/// Cases grouped under one shipping batch id.
#[derive(Debug, Clone, Serialize)]
pub struct ShippingBatch {
    pub batch_id: String,
    pub carrier: String,
    pub tracking_number: String,
    pub shipped_at: Option<DateTime<Utc>>,
    pub shipping_cost: Option<Money>,
    pub case_ids: Vec<String>,
}

/// Marks a set of milled cases as shipped under one carrier and tracking number.
pub struct ShippingBatchRecorder {
    store: Arc<dyn CaseStore>,
    audit: Option<AuditHandle>,
}

impl ShippingBatchRecorder {
    pub fn new(store: Arc<dyn CaseStore>) -> Self {
        Self { store, audit: None }
    }

    /// Set the audit handle for emitting events.
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Record a shipment for every listed case, or for none of them.
    ///
    /// Every case must be `IN_MILLING`; otherwise the batch is rejected naming
    /// the offending cases and nothing is written.
    pub async fn ship(&self, request: ShipRequest) -> Result<ShipOutcome, CaseError> {
        let result = self.record(&request);

        match &result {
            Ok(outcome) => {
                metrics::SHIPPING_BATCHES_TOTAL
                    .with_label_values(&["recorded"])
                    .inc();
                metrics::CASES_SHIPPED.inc_by(outcome.case_ids.len() as u64);
                info!(
                    batch_id = %outcome.batch_id,
                    cases = outcome.case_ids.len(),
                    carrier = %request.carrier,
                    "Shipping batch recorded"
                );
            }
            Err(e) => {
                metrics::SHIPPING_BATCHES_TOTAL
                    .with_label_values(&["rejected"])
                    .inc();
                warn!(error = %e, "Shipping batch rejected");
            }
        }
        let outcome = result?;

        if let Some(ref audit) = self.audit {
            audit
                .emit(AuditEvent::ShippingBatchRecorded {
                    batch_id: outcome.batch_id.clone(),
                    recorded_by: request.actor.user_id.clone(),
                    carrier: request.carrier.trim().to_string(),
                    tracking_number: request.tracking_number.trim().to_string(),
                    case_ids: outcome.case_ids.clone(),
                    shipping_cost: request.shipping_cost,
                })
                .await;
        }

        Ok(outcome)
    }

    fn record(&self, request: &ShipRequest) -> Result<ShipOutcome, CaseError> {
        if !request.actor.role.can_run_production() {
            return Err(CaseError::Unauthorized(format!(
                "role {} cannot record shipments",
                request.actor.role
            )));
        }

        let carrier = request.carrier.trim();
        let tracking = request.tracking_number.trim();
        if carrier.is_empty() || tracking.is_empty() {
            return Err(CaseError::Validation(
                "carrier and tracking number are required".to_string(),
            ));
        }

        let ids = dedupe_ids(&request.case_ids);
        if ids.is_empty() {
            return Err(CaseError::Validation(
                "at least one case id is required".to_string(),
            ));
        }

        let batch_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        self.store.with_transaction(&mut |tx| {
            let mut cases = Vec::with_capacity(ids.len());
            let mut missing = Vec::new();
            for id in &ids {
                match tx.get_case(id)? {
                    Some(case) => cases.push(case),
                    None => missing.push(id.clone()),
                }
            }
            if !missing.is_empty() {
                return Err(CaseError::CasesNotFound(missing));
            }

            let not_milling: Vec<String> = cases
                .iter()
                .filter(|c| c.status != CaseStatus::InMilling)
                .map(|c| c.id.clone())
                .collect();
            if !not_milling.is_empty() {
                return Err(CaseError::ShippingRejected {
                    case_ids: not_milling,
                });
            }

            for mut case in cases {
                advance(&mut case, CaseStatus::Shipped, now);
                case.shipment = Some(Shipment {
                    batch_id: batch_id.clone(),
                    carrier: carrier.to_string(),
                    tracking_number: tracking.to_string(),
                    cost: request.shipping_cost,
                });
                tx.update_case(&case)?;
                tx.insert_status_event(&status_event(
                    &case.id,
                    CaseStatus::InMilling,
                    CaseStatus::Shipped,
                    Some(format!("Shipped via {} ({})", carrier, tracking)),
                    &request.actor.user_id,
                    now,
                ))?;
            }
            Ok(())
        })?;

        Ok(ShipOutcome {
            batch_id,
            case_ids: ids,
            shipped_at: now,
        })
    }

    /// Reassemble a recorded batch from its cases.
    pub fn batch(&self, batch_id: &str) -> Result<ShippingBatch, CaseError> {
        let cases = self.store.find_cases_by_batch(batch_id)?;
        let first = cases
            .first()
            .and_then(|c| c.shipment.clone().map(|s| (s, c.shipped_at)));
        let Some((shipment, shipped_at)) = first else {
            return Err(CaseError::BatchNotFound(batch_id.to_string()));
        };

        Ok(ShippingBatch {
            batch_id: shipment.batch_id,
            carrier: shipment.carrier,
            tracking_number: shipment.tracking_number,
            shipped_at,
            shipping_cost: shipment.cost,
            case_ids: cases.into_iter().map(|c| c.id).collect(),
        })
    }
}
