use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use labflow_core::{ActorRole, CaseError, Money, ShipRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use super::middleware::{ApiJson, AuthIdentity};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadBody {
    pub ids: Vec<String>,
}

/// Build the production archive for the selected cases.
///
/// Responds with the zip itself; approved cases in the batch move to milling
/// before the response is sent.
pub async fn download(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    ApiJson(body): ApiJson<DownloadBody>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .exporter()
        .export(&body.ids, &identity, Utc::now().date_naive())
        .await?;

    let archive = outcome.archive;
    info!(
        file_name = %archive.file_name,
        entries = archive.included.len(),
        skipped = archive.skipped.len(),
        released = outcome.released.len(),
        "Serving production archive"
    );

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", archive.file_name),
        ),
        (HeaderName::from_static("x-archive-entries"), archive.included.len().to_string()),
        (HeaderName::from_static("x-archive-skipped"), archive.skipped.len().to_string()),
    ];
    Ok((StatusCode::OK, headers, archive.bytes))
}

/// Body of `POST /cases/batch/ship`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipBody {
    pub ids: Vec<String>,
    pub carrier: String,
    pub tracking: String,
    #[serde(default)]
    pub shipping_cost: Option<Money>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipResponse {
    pub ok: bool,
    pub batch_id: String,
}

pub async fn ship(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    ApiJson(body): ApiJson<ShipBody>,
) -> Result<Json<ShipResponse>, ApiError> {
    let outcome = state
        .shipping()
        .ship(ShipRequest {
            case_ids: body.ids,
            carrier: body.carrier,
            tracking_number: body.tracking,
            shipping_cost: body.shipping_cost,
            actor: identity,
        })
        .await?;

    Ok(Json(ShipResponse {
        ok: true,
        batch_id: outcome.batch_id,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentResponse {
    pub batch_id: String,
    pub carrier: String,
    pub tracking_number: String,
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_cost: Option<Money>,
    pub case_ids: Vec<String>,
}

/// Look up a recorded shipping batch. Staff only.
pub async fn get_shipment(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    Path(batch_id): Path<String>,
) -> Result<Json<ShipmentResponse>, ApiError> {
    if identity.role == ActorRole::Customer {
        return Err(CaseError::Forbidden(
            "shipping batches are visible to staff only".to_string(),
        )
        .into());
    }

    let batch = state.shipping().batch(&batch_id)?;
    Ok(Json(ShipmentResponse {
        batch_id: batch.batch_id,
        carrier: batch.carrier,
        tracking_number: batch.tracking_number,
        shipped_at: batch.shipped_at,
        shipping_cost: batch.shipping_cost,
        case_ids: batch.case_ids,
    }))
}
