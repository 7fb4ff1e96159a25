//! `arcaflow-server`: the deployable binary wiring together the step
//! engine, transaction store, autoscaler, and intake API (§10).

mod api;
mod autoscaler;
mod config;
mod errors;
mod observability;
mod orchestrator;
mod registry;
mod retry;
mod service;

use std::env;
use std::sync::Arc;

use flow_adapters::simulated::SimulatedBrowserDriver;
use flow_providers::control_plane::{ControlPlane, HttpHubProbe, HubProbe, ShellControlPlane};
use flow_providers::credentials::{CredentialResolver, EnvCredentialResolver};
use flow_providers::events::{EventPublisher, KafkaEventPublisher, NoopEventPublisher};
use flow_store::{InMemoryTransactionStore, RedisTransactionStore, TransactionStore};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::autoscaler::Autoscaler;
use crate::config::AppConfig;
use crate::orchestrator::Orchestrator;
use crate::registry::WorkflowRegistry;
use crate::retry::RetrySweeper;
use crate::service::ApplicationService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    AppConfig::from_env()?.install();
    let config = AppConfig::get();

    observability::init_tracing();
    let metrics_handle = observability::init_metrics();

    let store: Arc<dyn TransactionStore> = Arc::new(observability::InstrumentedTransactionStore::new(build_store(config).await));

    let credential_resolver: Arc<dyn CredentialResolver> = Arc::new(EnvCredentialResolver::new());

    let control_plane: Arc<dyn ControlPlane> =
        Arc::new(ShellControlPlane::new(env::var("ARCAFLOW_COMPOSE_FILE").unwrap_or_else(|_| "docker-compose.yml".to_string()),
                                         env::var("ARCAFLOW_COMPOSE_SERVICE").unwrap_or_else(|_| "browser".to_string())));
    let hub: Arc<dyn HubProbe> = Arc::new(HttpHubProbe::new(&config.autoscaler.hub_url));
    let autoscaler = Arc::new(Autoscaler::new(&config.autoscaler, control_plane, hub));

    let monitor_handle = autoscaler.clone();
    tokio::spawn(async move { monitor_handle.run_monitor_loop().await });

    let driver = Arc::new(observability::InstrumentedBrowserDriver::new(Arc::new(SimulatedBrowserDriver)));
    let registry = Arc::new(WorkflowRegistry::build(driver)?);

    let publisher = build_publisher(config);

    let orchestrator = Orchestrator::new(store.clone(), publisher, autoscaler.clone(), registry);
    let service = Arc::new(ApplicationService::new(store.clone(), credential_resolver.clone(), orchestrator.clone()));
    let retry_sweeper = RetrySweeper::new(store.clone(), credential_resolver, orchestrator);

    let state =
        api::AppState { service, store, retry_sweeper, metrics_handle, default_max_retries: config.default_max_retries };
    let router = api::build_router(state);

    let listener = TcpListener::bind(config.http.bind_addr).await?;
    info!(addr = %config.http.bind_addr, "arcaflow listening");
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    autoscaler.shutdown();
    Ok(())
}

/// Connects to the configured Redis-backed store, falling back to the
/// in-memory backend both when the store is explicitly disabled and when
/// the real backend is unreachable at startup — a degraded process is
/// better than one that can't start at all (the in-memory backend is
/// documented in flow-store as the degraded-mode / test fallback).
async fn build_store(config: &AppConfig) -> Arc<dyn TransactionStore> {
    if !config.store.enabled {
        return Arc::new(InMemoryTransactionStore::new());
    }
    match RedisTransactionStore::connect(&config.store.url).await {
        Ok(store) => Arc::new(store),
        Err(err) => {
            warn!(error = %err, "failed to connect to the transaction store, falling back to the in-memory backend");
            Arc::new(InMemoryTransactionStore::new())
        }
    }
}

fn build_publisher(config: &AppConfig) -> Arc<dyn EventPublisher> {
    match &config.bus.bootstrap_servers {
        Some(servers) => match KafkaEventPublisher::new(servers, config.bus.topic.clone()) {
            Ok(publisher) => Arc::new(publisher),
            Err(err) => {
                warn!(error = %err, "failed to initialize kafka publisher, falling back to a no-op publisher");
                Arc::new(NoopEventPublisher)
            }
        },
        None => Arc::new(NoopEventPublisher),
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
