//! Cross-cutting request middleware: the shared-token auth guard (§6
//! "Auth") and the HTTP request/duration metrics recorder (§10.2).

use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::AppState;
use crate::config::AppConfig;
use crate::errors::ApplicationError;
use crate::observability;

const TOKEN_HEADER: &str = "X-API-Token";

/// Rejects any request whose `X-API-Token` header doesn't match the
/// configured token. Applied only to the routes `/health`/`/metrics` are
/// exempt from (see [`super::build_router`]).
pub async fn auth_guard(State(_state): State<AppState>, request: Request, next: Next) -> Response {
    let presented = request.headers().get(TOKEN_HEADER).and_then(|v| v.to_str().ok());

    let outcome = match presented {
        Some(token) if token == AppConfig::get().auth.token => "accepted",
        _ => "rejected",
    };
    observability::record_auth_attempt(outcome);

    if outcome == "rejected" {
        return ApplicationError::Unauthorized { header: TOKEN_HEADER }.into_response();
    }

    next.run(request).await
}

/// Records every response's (method, matched path, status) into the
/// `arcaflow_http_requests_total`/`arcaflow_http_request_duration_seconds`
/// metrics (§4.8). Runs outside the auth guard so even rejected/health
/// traffic is counted.
pub async fn record_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let endpoint = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    observability::record_http_request(&method, &endpoint, response.status().as_u16(), started.elapsed());
    response
}
