//! Store connection configuration, read from the environment by the
//! application layer and handed to [`crate::redis_store::RedisTransactionStore::connect`].

use std::env;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub enabled: bool,
    pub default_ttl_seconds: u64,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let url = env::var("TRANSACTION_STORE_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let enabled = env::var("TRANSACTION_STORE_ENABLED").ok()
                                                             .map(|v| v != "0" && v.to_lowercase() != "false")
                                                             .unwrap_or(true);
        let default_ttl_seconds = env::var("TRANSACTION_STORE_DEFAULT_TTL_SECONDS").ok()
                                                                                    .and_then(|v| v.parse().ok())
                                                                                    .unwrap_or(flow_domain::ttl::DEFAULT_TTL_SECONDS);
        Self { url, enabled, default_ttl_seconds }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let cfg = StoreConfig { url: "redis://127.0.0.1:6379".into(), enabled: true, default_ttl_seconds: 3600 };
        assert!(cfg.enabled);
        assert_eq!(cfg.default_ttl_seconds, 3600);
    }
}
