//! Fleet control for the autoscaler (§4.9). `ControlPlane` issues the scale
//! command; `HubProbe` reports what the hub currently sees. Both are narrow
//! traits so `flow-policies::scaling`'s pure sizing math never has to know
//! how a node actually gets started or counted.

use async_trait::async_trait;
use flow_domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStatus {
    pub nodes_ready: u32,
    pub active_sessions: u32,
}

#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Changes fleet size to `target_nodes`. Errors here are infrastructure
    /// failures (the command didn't run or exited non-zero); the caller
    /// decides whether that's retryable at the autoscaler-loop level.
    async fn scale_to(&self, target_nodes: u32) -> Result<(), DomainError>;
}

#[async_trait]
pub trait HubProbe: Send + Sync {
    async fn status(&self) -> Result<HubStatus, DomainError>;
}

/// Invokes `docker compose ... --scale <service>=<n>` (§8 "the scaler
/// invokes an external command"). The service name and compose file are
/// fixed at construction; only the replica count varies per call.
pub struct ShellControlPlane {
    compose_file: String,
    service: String,
}

impl ShellControlPlane {
    pub fn new(compose_file: impl Into<String>, service: impl Into<String>) -> Self {
        Self { compose_file: compose_file.into(), service: service.into() }
    }
}

#[async_trait]
impl ControlPlane for ShellControlPlane {
    async fn scale_to(&self, target_nodes: u32) -> Result<(), DomainError> {
        let output = tokio::process::Command::new("docker").arg("compose")
                                                             .arg("-f")
                                                             .arg(&self.compose_file)
                                                             .arg("up")
                                                             .arg("-d")
                                                             .arg("--scale")
                                                             .arg(format!("{}={}", self.service, target_nodes))
                                                             .output()
                                                             .await
                                                             .map_err(|err| {
                                                                 DomainError::TransientInfrastructure(format!(
                    "failed to spawn docker compose: {err}"
                ))
                                                             })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DomainError::TransientInfrastructure(format!(
                "docker compose scale exited with {}: {stderr}",
                output.status
            )));
        }
        Ok(())
    }
}

/// Polls a Selenium Grid-compatible hub's `/status` endpoint. Counts a node
/// ready when the grid reports its availability as `"UP"`, and an active
/// session as any slot on an up node with a non-null `session`.
pub struct HttpHubProbe {
    client: reqwest::Client,
    status_url: String,
}

impl HttpHubProbe {
    pub fn new(hub_url: impl AsRef<str>) -> Self {
        let status_url = format!("{}/status", hub_url.as_ref().trim_end_matches('/'));
        Self { client: reqwest::Client::new(), status_url }
    }
}

#[async_trait]
impl HubProbe for HttpHubProbe {
    async fn status(&self) -> Result<HubStatus, DomainError> {
        let body: serde_json::Value =
            self.client
                .get(&self.status_url)
                .send()
                .await
                .map_err(|err| DomainError::TransientInfrastructure(format!("hub status request failed: {err}")))?
                .json()
                .await
                .map_err(|err| {
                    DomainError::TransientInfrastructure(format!("hub status response was not JSON: {err}"))
                })?;

        let nodes = body.pointer("/value/nodes").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        let mut nodes_ready = 0u32;
        let mut active_sessions = 0u32;
        for node in &nodes {
            let up = node.get("availability").and_then(|v| v.as_str()) == Some("UP");
            if up {
                nodes_ready += 1;
            }
            let slots = node.get("slots").and_then(|v| v.as_array()).cloned().unwrap_or_default();
            for slot in &slots {
                if up && !slot.get("session").map(serde_json::Value::is_null).unwrap_or(true) {
                    active_sessions += 1;
                }
            }
        }
        Ok(HubStatus { nodes_ready, active_sessions })
    }
}

/// Deterministic in-process stand-in for a hub, used in tests and
/// environments with no real browser fleet. Tracks nodes and sessions as
/// plain counters an owner can mutate between assertions.
pub struct SimulatedHubProbe {
    nodes_ready: std::sync::atomic::AtomicU32,
    active_sessions: std::sync::atomic::AtomicU32,
}

impl SimulatedHubProbe {
    pub fn new(nodes_ready: u32, active_sessions: u32) -> Self {
        Self { nodes_ready: std::sync::atomic::AtomicU32::new(nodes_ready),
               active_sessions: std::sync::atomic::AtomicU32::new(active_sessions) }
    }

    pub fn set_nodes_ready(&self, n: u32) {
        self.nodes_ready.store(n, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set_active_sessions(&self, n: u32) {
        self.active_sessions.store(n, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl HubProbe for SimulatedHubProbe {
    async fn status(&self) -> Result<HubStatus, DomainError> {
        Ok(HubStatus { nodes_ready: self.nodes_ready.load(std::sync::atomic::Ordering::SeqCst),
                        active_sessions: self.active_sessions.load(std::sync::atomic::Ordering::SeqCst) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_hub_probe_reports_what_it_was_told() {
        let hub = SimulatedHubProbe::new(2, 5);
        let status = hub.status().await.unwrap();
        assert_eq!(status.nodes_ready, 2);
        assert_eq!(status.active_sessions, 5);

        hub.set_nodes_ready(4);
        hub.set_active_sessions(0);
        let status = hub.status().await.unwrap();
        assert_eq!(status.nodes_ready, 4);
        assert_eq!(status.active_sessions, 0);
    }
}
