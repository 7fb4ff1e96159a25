//! The intake HTTP transport (§6, §10.1). A thin axum shell: request
//! parsing, auth-header checking, and status-code mapping only — every
//! business decision lives in [`crate::service`]/[`crate::retry`] below it.

pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use flow_store::TransactionStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::retry::RetrySweeper;
use crate::service::ApplicationService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ApplicationService>,
    pub store: Arc<dyn TransactionStore>,
    pub retry_sweeper: Arc<RetrySweeper>,
    pub metrics_handle: PrometheusHandle,
    pub default_max_retries: u32,
}

/// Assembles the full route table. `/health` and `/metrics` sit outside the
/// auth guard (§6 "a shared token is required on every path except health,
/// docs, metrics"); everything else is wrapped in [`middleware::auth_guard`].
pub fn build_router(state: AppState) -> Router {
    let guarded = Router::new().route("/workflows/{kind}/execute", post(handlers::execute_workflow))
                                .route("/workflows/{run_id}/status", get(handlers::get_status))
                                .route("/workflows", get(handlers::list_workflows))
                                .route("/retry", post(handlers::retry))
                                .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::auth_guard));

    let open = Router::new().route("/health", get(handlers::health)).route("/metrics", get(handlers::metrics));

    Router::new().merge(guarded)
                 .merge(open)
                 .layer(axum::middleware::from_fn(middleware::record_http_metrics))
                 .layer(TraceLayer::new_for_http())
                 .layer(CorsLayer::permissive())
                 .with_state(state)
}
