//! Top-level application error taxonomy (§7, §10.2) and its HTTP mapping
//! (§6). Every internal layer propagates with `?`/`#[from]`; this is the
//! single place a taxonomy value turns into a transport status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use flow_domain::{DomainError, ErrorKind};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("duplicate transaction")]
    DuplicateTransaction { transaction_hash: String, existing_exchange_id: Uuid },

    #[error("failed to create transaction record")]
    TransactionCreation,

    #[error("no workflow launch succeeded for this run")]
    WorkflowStartup,

    #[error("no run found for id {0}")]
    NotFound(Uuid),

    #[error("missing or invalid {header} header")]
    Unauthorized { header: &'static str },
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::Domain(e) => e.kind(),
            ApplicationError::DuplicateTransaction { .. } => ErrorKind::DuplicateTransaction,
            ApplicationError::TransactionCreation | ApplicationError::WorkflowStartup => ErrorKind::SystemFatal,
            ApplicationError::NotFound(_) => ErrorKind::BusinessRule,
            ApplicationError::Unauthorized { .. } => ErrorKind::BusinessRule,
        }
    }
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        match self {
            ApplicationError::Domain(DomainError::Validation(msg)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"error": "Validation", "message": msg}))).into_response()
            }
            ApplicationError::Domain(DomainError::DuplicateTransaction { existing_run_id }) => {
                (StatusCode::CONFLICT,
                 Json(flow_domain::DuplicateTransactionBody::new("", existing_run_id.parse::<Uuid>().unwrap_or_default())))
                    .into_response()
            }
            ApplicationError::DuplicateTransaction { transaction_hash, existing_exchange_id } => {
                (StatusCode::CONFLICT, Json(flow_domain::DuplicateTransactionBody::new(transaction_hash, existing_exchange_id)))
                    .into_response()
            }
            ApplicationError::Domain(DomainError::BusinessRule(msg)) => {
                (StatusCode::BAD_REQUEST, Json(json!({"error": "BusinessRule", "message": msg}))).into_response()
            }
            ApplicationError::Domain(DomainError::TransientInfrastructure(msg)) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "TransientInfrastructure", "message": msg})))
                    .into_response()
            }
            ApplicationError::Domain(DomainError::SystemFatal(msg)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "SystemFatal", "message": msg}))).into_response()
            }
            ApplicationError::TransactionCreation => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "TransactionCreationError"}))).into_response()
            }
            ApplicationError::WorkflowStartup => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "WorkflowStartupError"}))).into_response()
            }
            ApplicationError::NotFound(run_id) => {
                (StatusCode::NOT_FOUND, Json(json!({"error": "NotFound", "run_id": run_id}))).into_response()
            }
            ApplicationError::Unauthorized { header } => {
                (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized", "message": format!("missing or invalid {header}")})))
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_system_fatal_kind_table_entry() {
        let err = ApplicationError::Domain(DomainError::Validation("bad".into()));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn duplicate_transaction_kind_is_duplicate_transaction() {
        let err = ApplicationError::DuplicateTransaction { transaction_hash: "h".into(),
                                                             existing_exchange_id: Uuid::new_v4() };
        assert_eq!(err.kind(), ErrorKind::DuplicateTransaction);
    }
}
