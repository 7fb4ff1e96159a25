//! Route handlers for the intake API (§6). Each one parses its input,
//! delegates to the application service / retry sweeper / store, and lets
//! [`crate::errors::ApplicationError`]'s `IntoResponse` impl handle the
//! failure-path status mapping.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use flow_domain::{DeclarationEntry, ReconciliationEntry, Request, RunStatus, StatusResponse, WorkflowKind};
use serde_json::Value;
use uuid::Uuid;

use crate::api::AppState;
use crate::errors::ApplicationError;

pub async fn execute_workflow(State(state): State<AppState>, Path(kind): Path<String>, Json(body): Json<Value>)
                               -> Result<Json<Value>, ApplicationError> {
    let kind = WorkflowKind::from_route_segment(&kind)?;

    match kind {
        WorkflowKind::AccountReconciliation => {
            let request: Request<ReconciliationEntry> = serde_json::from_value(body).map_err(|e| {
                ApplicationError::Domain(flow_domain::DomainError::Validation(format!("malformed request body: {e}")))
            })?;
            let response = state.service.execute_reconciliation(request).await?;
            Ok(Json(serde_json::to_value(response).expect("ExecutionResponse always serializes")))
        }
        WorkflowKind::DeclarationUpload => {
            let request: Request<DeclarationEntry> = serde_json::from_value(body).map_err(|e| {
                ApplicationError::Domain(flow_domain::DomainError::Validation(format!("malformed request body: {e}")))
            })?;
            let response = state.service.execute_declaration(request).await?;
            Ok(Json(serde_json::to_value(response).expect("ExecutionResponse always serializes")))
        }
    }
}

pub async fn get_status(State(state): State<AppState>, Path(run_id): Path<Uuid>)
                         -> Result<Json<StatusResponse>, ApplicationError> {
    let key = run_id.to_string();
    let record = state.store.get_transaction(&key).await.ok_or(ApplicationError::NotFound(run_id))?;

    let started_at = (record.status != RunStatus::Created).then_some(record.created_at);
    let completed_at = record.status.is_terminal().then_some(record.updated_at);

    Ok(Json(StatusResponse { run_id,
                              status: record.status,
                              started_at,
                              completed_at,
                              results: record.results,
                              errors: record.errors }))
}

#[derive(serde::Deserialize)]
pub struct RetryQuery {
    max_retries: Option<u32>,
}

pub async fn retry(State(state): State<AppState>, Query(query): Query<RetryQuery>) -> Json<flow_domain::RetryStats> {
    let max_retries = query.max_retries.unwrap_or(state.default_max_retries);
    Json(state.retry_sweeper.sweep(max_retries).await)
}

pub async fn list_workflows() -> Json<Value> {
    let kinds: Vec<Value> = [WorkflowKind::AccountReconciliation, WorkflowKind::DeclarationUpload].into_iter()
        .map(|kind| serde_json::json!({"kind": kind.as_str(), "route_segment": kind.route_segment()}))
        .collect();
    Json(serde_json::json!({"workflows": kinds}))
}

pub async fn health() -> Json<HashMap<&'static str, &'static str>> {
    let mut body = HashMap::new();
    body.insert("status", "ok");
    Json(body)
}

pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}
