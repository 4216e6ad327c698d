use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{audit, batch, cases, handlers, pricing};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Everything that acts on cases needs an identity
    let protected = Router::new()
        .route("/config", get(handlers::get_config))
        .route("/audit", get(audit::query_audit))
        // Cases
        .route("/cases/{id}", get(cases::get_case))
        .route("/cases/{id}/events", get(cases::list_events))
        .route("/cases/{id}/transition", post(cases::transition))
        // Production batches
        .route("/cases/batch/download", post(batch::download))
        .route("/cases/batch/ship", post(batch::ship))
        .route("/cases/batch/shipments/{batch_id}", get(batch::get_shipment))
        // Pricing
        .route("/pricing/quote", get(pricing::quote))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .merge(protected)
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
