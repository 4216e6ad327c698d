use axum::{
    extract::{Query, State},
    Json,
};
use labflow_core::case::{Material, ProductType};
use labflow_core::{CaseError, Money};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::middleware::AuthIdentity;
use crate::state::AppState;

/// Query parameters for `GET /pricing/quote`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteParams {
    pub product: String,
    pub material: String,
    /// Defaults to one unit
    pub units: Option<u32>,
    #[serde(default)]
    pub sales_rep: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub product: ProductType,
    pub material: Material,
    pub units: u32,
    pub milling: Money,
    pub design: Money,
    pub commission: Money,
    pub total: Money,
}

fn parse_param<T>(value: &str) -> Result<T, CaseError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|e: T::Err| CaseError::Validation(e.to_string()))
}

/// Cost breakdown for a prospective case.
pub async fn quote(
    State(state): State<Arc<AppState>>,
    AuthIdentity(_identity): AuthIdentity,
    Query(params): Query<QuoteParams>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let product: ProductType = parse_param(&params.product)?;
    let material: Material = parse_param(&params.material)?;
    let units = params.units.unwrap_or(1);

    let costs = state
        .lifecycle()
        .pricing()
        .costs(product, material, units, params.sales_rep)
        .map_err(CaseError::from)?;

    Ok(Json(QuoteResponse {
        product,
        material,
        units,
        milling: costs.milling,
        design: costs.design,
        commission: costs.commission,
        total: costs.total,
    }))
}
