use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use labflow_core::{ActorRole, AuditQuery, AuditRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use super::error::ErrorResponse;
use super::middleware::AuthIdentity;
use crate::state::AppState;

const MAX_LIMIT: u32 = 1000;

/// Query string of `GET /audit`; every filter is optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditParams {
    /// Also matches batch events that include the case
    pub case_id: Option<String>,
    pub event_type: Option<String>,
    pub actor_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl AuditParams {
    fn into_query(self) -> AuditQuery {
        let mut query = AuditQuery::new().between(self.since, self.until);
        if let Some(case_id) = self.case_id {
            query = query.for_case(case_id);
        }
        if let Some(event_type) = self.event_type {
            query = query.of_type(event_type);
        }
        if let Some(actor_id) = self.actor_id {
            query = query.by_actor(actor_id);
        }
        let limit = self.limit.unwrap_or(query.limit).clamp(1, MAX_LIMIT);
        query.page(limit, self.offset.unwrap_or(0))
    }
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub events: Vec<AuditRecord>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// Search the audit trail. Staff only.
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    AuthIdentity(identity): AuthIdentity,
    Query(params): Query<AuditParams>,
) -> Result<Json<AuditResponse>, (StatusCode, Json<ErrorResponse>)> {
    if identity.role == ActorRole::Customer {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                ok: false,
                error: "The audit log is visible to staff only".to_string(),
            }),
        ));
    }

    let query = params.into_query();
    let page = state.audit_store().search(&query).map_err(|e| {
        error!(error = %e, "Audit search failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                ok: false,
                error: "Failed to query audit events".to_string(),
            }),
        )
    })?;

    Ok(Json(AuditResponse {
        events: page.records,
        total: page.total,
        limit: query.limit,
        offset: query.offset,
    }))
}
