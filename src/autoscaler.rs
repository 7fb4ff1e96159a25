//! Session-fleet autoscaler (C10, §4.9). Wraps the pure sizing math in
//! `flow-policies::scaling` around a real [`ControlPlane`]/[`HubProbe`]
//! pair, tracking the fleet's believed size locally so `ensure_capacity`
//! never has to round-trip the hub before deciding whether to scale.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use flow_domain::DomainError;
use flow_policies::scaling::{nodes_needed, scale_up_delta, should_scale_down, ScalingConfig};
use flow_providers::control_plane::{ControlPlane, HubProbe};
use tokio::sync::{Mutex, Notify};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::AutoscalerConfig;

/// How long `ensure_capacity` will keep polling the hub for newly-ready
/// nodes after issuing a scale-up before giving up (§4.9 "bounded wait").
const CAPACITY_POLL_TIMEOUT: Duration = Duration::from_secs(30);
const CAPACITY_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct Autoscaler {
    scaling: ScalingConfig,
    control_plane: Arc<dyn ControlPlane>,
    hub: Arc<dyn HubProbe>,
    current_nodes: AtomicU32,
    last_activity: Mutex<Instant>,
    idle_timeout_s: u64,
    check_interval_s: u64,
    shutdown: Arc<Notify>,
}

impl Autoscaler {
    pub fn new(config: &AutoscalerConfig, control_plane: Arc<dyn ControlPlane>, hub: Arc<dyn HubProbe>) -> Self {
        Self { scaling: ScalingConfig { min_nodes: config.min_nodes,
                                        max_nodes: config.max_nodes,
                                        sessions_per_node: config.sessions_per_node },
               control_plane,
               hub,
               current_nodes: AtomicU32::new(config.min_nodes),
               last_activity: Mutex::new(Instant::now()),
               idle_timeout_s: config.idle_timeout_s,
               check_interval_s: config.check_interval_s,
               shutdown: Arc::new(Notify::new()) }
    }

    pub fn current_nodes(&self) -> u32 {
        self.current_nodes.load(Ordering::SeqCst)
    }

    /// Scales up (if needed) for `sessions_needed` additional concurrent
    /// browser sessions and waits, bounded by [`CAPACITY_POLL_TIMEOUT`],
    /// for the hub to report enough ready nodes. Returns `Ok(())` even on
    /// timeout — callers proceed on whatever capacity already exists
    /// rather than fail a launch outright over a slow-to-join node.
    pub async fn ensure_capacity(&self, sessions_needed: u32) -> Result<(), DomainError> {
        *self.last_activity.lock().await = Instant::now();

        let needed = nodes_needed(sessions_needed, self.scaling);
        let current = self.current_nodes();
        let Some(delta) = scale_up_delta(current, needed) else {
            return Ok(());
        };
        self.scale_up(delta).await?;

        let deadline = Instant::now() + CAPACITY_POLL_TIMEOUT;
        loop {
            match self.hub.status().await {
                Ok(status) if status.nodes_ready >= needed => return Ok(()),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "hub status probe failed while waiting for capacity"),
            }
            if Instant::now() >= deadline {
                warn!(needed, "timed out waiting for autoscaler capacity, proceeding with what is ready");
                return Ok(());
            }
            sleep(CAPACITY_POLL_INTERVAL).await;
        }
    }

    async fn scale_up(&self, delta: u32) -> Result<(), DomainError> {
        let target = (self.current_nodes() + delta).min(self.scaling.max_nodes);
        self.control_plane.scale_to(target).await?;
        self.current_nodes.store(target, Ordering::SeqCst);
        info!(target, "scaled fleet up");
        Ok(())
    }

    async fn scale_down(&self, delta: u32) -> Result<(), DomainError> {
        let target = self.current_nodes().saturating_sub(delta).max(self.scaling.min_nodes);
        self.control_plane.scale_to(target).await?;
        self.current_nodes.store(target, Ordering::SeqCst);
        info!(target, "scaled fleet down");
        Ok(())
    }

    /// Background idle-shrink loop (§4.9 "Monitor loop"). Cancellable via
    /// [`Autoscaler::shutdown`]; intended to be spawned once at startup and
    /// left running for the process lifetime.
    pub async fn run_monitor_loop(&self) {
        loop {
            tokio::select! {
                _ = sleep(Duration::from_secs(self.check_interval_s)) => {}
                _ = self.shutdown.notified() => {
                    info!("autoscaler monitor loop shutting down");
                    return;
                }
            }

            let idle_seconds = self.last_activity.lock().await.elapsed().as_secs();
            let current = self.current_nodes();
            if should_scale_down(current, self.scaling.min_nodes, idle_seconds, self.idle_timeout_s) {
                if let Err(err) = self.scale_down(1).await {
                    warn!(error = %err, "idle scale-down failed");
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use flow_providers::control_plane::{HubStatus, SimulatedHubProbe};

    use super::*;

    struct NoopControlPlane;

    #[async_trait::async_trait]
    impl ControlPlane for NoopControlPlane {
        async fn scale_to(&self, _target_nodes: u32) -> Result<(), DomainError> {
            Ok(())
        }
    }

    fn config() -> AutoscalerConfig {
        AutoscalerConfig { min_nodes: 1,
                            max_nodes: 5,
                            sessions_per_node: 2,
                            hub_url: "http://localhost:4444".into(),
                            idle_timeout_s: 60,
                            check_interval_s: 5 }
    }

    #[tokio::test]
    async fn ensure_capacity_scales_up_and_returns_once_hub_reports_ready() {
        let hub = Arc::new(SimulatedHubProbe::new(0, 0));
        let scaler = Autoscaler::new(&config(), Arc::new(NoopControlPlane), hub.clone());
        hub.set_nodes_ready(3);
        scaler.ensure_capacity(5).await.unwrap();
        assert_eq!(scaler.current_nodes(), 3);
    }

    #[tokio::test]
    async fn ensure_capacity_is_noop_when_already_sufficient() {
        let hub = Arc::new(SimulatedHubProbe::new(0, 0));
        let scaler = Autoscaler::new(&config(), Arc::new(NoopControlPlane), hub);
        scaler.ensure_capacity(1).await.unwrap();
        assert_eq!(scaler.current_nodes(), 1);
    }

    #[test]
    fn hub_status_eq_for_sanity() {
        let a = HubStatus { nodes_ready: 1, active_sessions: 1 };
        let b = HubStatus { nodes_ready: 1, active_sessions: 1 };
        assert_eq!(a, b);
    }
}
