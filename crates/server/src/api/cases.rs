use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use labflow_core::case::Shipment;
use labflow_core::{
    Case, CaseError, CaseStage, CaseStatus, Money, StatusEvent, TransitionRequest,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::middleware::{ApiJson, AuthIdentity};
use crate::state::AppState;

/// Body of `POST /cases/{id}/transition`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionBody {
    pub to: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub waive_fee: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    pub ok: bool,
    pub status: CaseStatus,
    pub stage: CaseStage,
    pub at: DateTime<Utc>,
    /// Only present for cancellations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<Money>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentView {
    pub batch_id: String,
    pub carrier: String,
    pub tracking_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_cost: Option<Money>,
}

impl From<Shipment> for ShipmentView {
    fn from(s: Shipment) -> Self {
        Self {
            batch_id: s.batch_id,
            carrier: s.carrier,
            tracking_number: s.tracking_number,
            shipping_cost: s.cost,
        }
    }
}

/// Case as seen by API clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseView {
    pub id: String,
    pub clinic_id: String,
    pub doctor_id: String,
    pub patient_alias: String,
    pub shade: String,
    pub product: String,
    pub material: String,
    pub units: u32,
    pub status: CaseStatus,
    pub stage: CaseStage,
    pub cost: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub designed_at: Option<DateTime<Utc>>,
    pub milled_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub shipment: Option<ShipmentView>,
}

impl From<Case> for CaseView {
    fn from(case: Case) -> Self {
        Self {
            id: case.id,
            clinic_id: case.clinic_id,
            doctor_id: case.doctor_id,
            patient_alias: case.patient.alias,
            shade: case.shade,
            product: case.product.to_string(),
            material: case.material.to_string(),
            units: case.units,
            status: case.status,
            stage: case.stage,
            cost: case.cost,
            created_at: case.created_at,
            updated_at: case.updated_at,
            designed_at: case.designed_at,
            milled_at: case.milled_at,
            shipped_at: case.shipped_at,
            shipment: case.shipment.map(ShipmentView::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: i64,
    pub from: CaseStatus,
    pub to: CaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub actor_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<StatusEvent> for EventView {
    fn from(e: StatusEvent) -> Self {
        Self {
            id: e.id,
            from: e.from,
            to: e.to,
            note: e.note,
            actor_id: e.actor_id,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<EventView>,
}

/// Request a status change for one case.
pub async fn transition(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<TransitionBody>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let to: CaseStatus = body
        .to
        .trim()
        .to_ascii_uppercase()
        .parse::<CaseStatus>()
        .map_err(|e| CaseError::Validation(e.to_string()))?;

    let outcome = state
        .lifecycle()
        .request_transition(TransitionRequest {
            case_id: id,
            to,
            actor: identity,
            note: body.note.filter(|n| !n.trim().is_empty()),
            waive_fee: body.waive_fee,
        })
        .await?;

    Ok(Json(TransitionResponse {
        ok: true,
        status: outcome.status,
        stage: outcome.stage,
        at: outcome.at,
        fee: outcome.fee,
    }))
}

pub async fn get_case(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    Path(id): Path<String>,
) -> Result<Json<CaseView>, ApiError> {
    let case = state.lifecycle().case_for(&id, &identity)?;
    Ok(Json(CaseView::from(case)))
}

/// Status history, oldest first.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    Path(id): Path<String>,
) -> Result<Json<EventsResponse>, ApiError> {
    let events = state.lifecycle().history(&id, &identity)?;
    Ok(Json(EventsResponse {
        events: events.into_iter().map(EventView::from).collect(),
    }))
}
