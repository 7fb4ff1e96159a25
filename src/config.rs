//! Central application configuration (§10.3).
//!
//! Loaded once from the environment (optionally via a `.env` file through
//! `dotenvy` outside production) and stashed behind a lazily-initialized
//! static so the rest of the binary reads it without threading an `Arc`
//! through every call site. Missing required configuration fails
//! `AppConfig::from_env` at startup — never silently at first use deep
//! inside a request handler.

use std::env;
use std::net::SocketAddr;

use flow_domain::DomainError;
use flow_store::StoreConfig;
use once_cell::sync::OnceCell;

static APP_CONFIG: OnceCell<AppConfig> = OnceCell::new();

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub bind_addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// The shared token every intake/status/retry request must present in
    /// `X-API-Token` (§6 "Auth"). Health, docs, and metrics are exempt.
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct AutoscalerConfig {
    pub min_nodes: u32,
    pub max_nodes: u32,
    pub sessions_per_node: u32,
    pub hub_url: String,
    pub idle_timeout_s: u64,
    pub check_interval_s: u64,
}

#[derive(Debug, Clone)]
pub struct BusConfig {
    pub bootstrap_servers: Option<String>,
    pub topic: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub store: StoreConfig,
    pub autoscaler: AutoscalerConfig,
    pub bus: BusConfig,
    pub default_max_retries: u32,
}

fn read_token(env_var: &str, file_env_var: &str) -> Result<String, DomainError> {
    if let Ok(token) = env::var(env_var) {
        if !token.trim().is_empty() {
            return Ok(token);
        }
    }
    if let Ok(path) = env::var(file_env_var) {
        return std::fs::read_to_string(&path).map(|s| s.trim().to_string())
                                               .map_err(|e| {
                                                   DomainError::SystemFatal(format!(
                    "failed to read {file_env_var} at {path}: {e}"
                ))
                                               });
    }
    Err(DomainError::SystemFatal(format!("neither {env_var} nor {file_env_var} is set")))
}

fn env_parse_or<T: std::str::FromStr>(var: &str, default: T) -> Result<T, DomainError>
    where T::Err: std::fmt::Display
{
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|e| DomainError::SystemFatal(format!("invalid {var}={raw}: {e}"))),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Builds configuration from the process environment. Loads a `.env`
    /// file first (best-effort, never fatal if absent) so local/dev runs
    /// don't need real exported variables.
    pub fn from_env() -> Result<Self, DomainError> {
        let _ = dotenvy::dotenv();

        let bind_addr_raw = env::var("HTTP_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr: SocketAddr = bind_addr_raw.parse()
                                                  .map_err(|e| {
                                                      DomainError::SystemFatal(format!(
                "invalid HTTP_BIND_ADDR {bind_addr_raw}: {e}"
            ))
                                                  })?;

        let token = read_token("ARCAFLOW_API_TOKEN", "ARCAFLOW_API_TOKEN_FILE")?;

        let min_nodes = env_parse_or("AUTOSCALER_MIN_NODES", 1u32)?;
        let max_nodes = env_parse_or("AUTOSCALER_MAX_NODES", 10u32)?;
        let sessions_per_node = env_parse_or("AUTOSCALER_SESSIONS_PER_NODE", 5u32)?;
        let idle_timeout_s = env_parse_or("AUTOSCALER_IDLE_TIMEOUT_S", 300u64)?;
        let check_interval_s = env_parse_or("AUTOSCALER_CHECK_INTERVAL_S", 15u64)?;
        let hub_url = env::var("SELENIUM_HUB_URL").unwrap_or_else(|_| "http://localhost:4444".to_string());

        let bootstrap_servers = env::var("BUS_BOOTSTRAP_SERVERS").ok().filter(|s| !s.trim().is_empty());
        let topic = env::var("BUS_TOPIC").unwrap_or_else(|_| "workflow-finished".to_string());

        let default_max_retries =
            env_parse_or("DEFAULT_MAX_RETRIES", flow_core::constants::DEFAULT_MAX_RUN_RETRIES)?;

        Ok(Self { http: HttpConfig { bind_addr },
                  auth: AuthConfig { token },
                  store: StoreConfig::from_env(),
                  autoscaler: AutoscalerConfig { min_nodes,
                                                 max_nodes,
                                                 sessions_per_node,
                                                 hub_url,
                                                 idle_timeout_s,
                                                 check_interval_s },
                  bus: BusConfig { bootstrap_servers, topic },
                  default_max_retries })
    }

    /// Installs `self` as the process-wide configuration. Only the first
    /// call has any effect; subsequent calls (e.g. from tests) are no-ops.
    pub fn install(self) {
        let _ = APP_CONFIG.set(self);
    }

    /// Reads the installed configuration.
    ///
    /// # Panics
    /// Panics if [`AppConfig::install`] was never called — a programming
    /// error, not a runtime condition a caller can recover from.
    pub fn get() -> &'static AppConfig {
        APP_CONFIG.get().expect("AppConfig::install was never called")
    }
}
