//! Metrics and logging setup (C9, §10.1). Counters/histograms/gauges are
//! recorded through the `metrics` facade so the concrete exporter
//! (`metrics-exporter-prometheus`) stays an implementation detail of
//! `init_metrics`; callers elsewhere in the binary just call the `record_*`
//! helpers below.

use std::time::Duration;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

mod instrumentation;
pub use instrumentation::{InstrumentedBrowserDriver, InstrumentedTransactionStore};

/// Workflow-duration histogram buckets, seconds (§4.8).
const WORKFLOW_DURATION_BUCKETS: &[f64] = &[10.0, 30.0, 60.0, 120.0, 300.0, 600.0];

/// Initializes the global `tracing` subscriber. Verbosity comes from
/// `RUST_LOG`, falling back to `LOG_LEVEL`, falling back to `info` (§10.1).
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| {
                                                       let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
                                                       EnvFilter::try_new(level)
                                                   })
                                                   .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}

/// Installs the Prometheus recorder and returns the handle `GET /metrics`
/// renders on every scrape. Pins the workflow-duration histogram to the
/// fixed bucket set §4.8 names explicitly; every other histogram
/// (currently just HTTP request duration) keeps the exporter's default
/// buckets.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new().set_buckets_for_metric(Matcher::Full("arcaflow_workflow_duration_seconds".to_string()),
                                                     WORKFLOW_DURATION_BUCKETS)
                             .expect("workflow duration buckets are a valid, non-empty slice")
                             .install_recorder()
                             .expect("failed to install Prometheus recorder")
}

/// Per-kind Run outcome (§4.8 "per-kind run outcomes").
pub fn record_run_outcome(kind: &str, outcome: &str) {
    metrics::counter!("arcaflow_run_outcomes_total", "kind" => kind.to_string(), "outcome" => outcome.to_string())
        .increment(1);
}

/// Per-payment-method outcome.
pub fn record_payment_method_outcome(method: &str, outcome: &str) {
    metrics::counter!("arcaflow_payment_method_outcomes_total", "method" => method.to_string(), "outcome" => outcome.to_string())
        .increment(1);
}

/// Per-auth-attempt outcome (§6 "Auth").
pub fn record_auth_attempt(outcome: &str) {
    metrics::counter!("arcaflow_auth_attempts_total", "outcome" => outcome.to_string()).increment(1);
}

/// Per-browser-operation outcome.
pub fn record_browser_operation(operation: &str, outcome: &str) {
    metrics::counter!("arcaflow_browser_operations_total", "operation" => operation.to_string(), "outcome" => outcome.to_string())
        .increment(1);
}

/// Per-file-operation outcome (artifact encode/decode at the event
/// boundary — the core never touches a filesystem or bucket itself, but
/// still reports on the encode/decode work it does do, §1/§6).
pub fn record_file_operation(operation: &str, outcome: &str) {
    metrics::counter!("arcaflow_file_operations_total", "operation" => operation.to_string(), "outcome" => outcome.to_string())
        .increment(1);
}

/// Per-transaction-store-operation outcome.
pub fn record_transaction_operation(operation: &str, outcome: &str) {
    metrics::counter!("arcaflow_transaction_operations_total", "operation" => operation.to_string(), "outcome" => outcome.to_string())
        .increment(1);
}

/// HTTP totals by (method, endpoint, status class).
pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration: Duration) {
    let status_class = format!("{}xx", status / 100);
    metrics::counter!("arcaflow_http_requests_total",
                       "method" => method.to_string(), "endpoint" => endpoint.to_string(), "status_class" => status_class)
        .increment(1);
    metrics::histogram!("arcaflow_http_request_duration_seconds", "method" => method.to_string(), "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

/// Workflow-duration histogram, bucketed per §4.8 (10/30/60/120/300/600
/// seconds — bucket boundaries pinned once in [`init_metrics`]).
pub fn record_workflow_duration(kind: &str, duration: Duration) {
    metrics::histogram!("arcaflow_workflow_duration_seconds", "kind" => kind.to_string()).record(duration.as_secs_f64());
}

/// Per-workflow per-step outcome tagged {success, failed, retry} (§4.8).
pub fn record_step_outcome(workflow: &str, step: &str, outcome: &str) {
    metrics::counter!("arcaflow_step_outcomes_total",
                       "workflow" => workflow.to_string(), "step" => step.to_string(), "outcome" => outcome.to_string())
        .increment(1);
}

/// Active-runs gauge: incremented on spawn, decremented on terminal.
pub fn set_active_runs(count: i64) {
    metrics::gauge!("arcaflow_active_runs").set(count as f64);
}

/// A [`flow_core::StepObserver`] that forwards every step outcome into the
/// metrics facade, keeping `flow-core` itself free of any exporter
/// dependency.
pub struct MetricsStepObserver;

impl flow_core::engine::StepObserver for MetricsStepObserver {
    fn on_step(&self, workflow: &str, step: &str, outcome: flow_core::engine::ObservedStepOutcome, _duration: Duration) {
        let tag = match outcome {
            flow_core::engine::ObservedStepOutcome::Success => "success",
            flow_core::engine::ObservedStepOutcome::Retry => "retry",
            flow_core::engine::ObservedStepOutcome::Failed => "failed",
            flow_core::engine::ObservedStepOutcome::Skipped => "skipped",
        };
        record_step_outcome(workflow, step, tag);
    }
}
