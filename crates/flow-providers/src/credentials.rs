//! Credential resolution (§4.6 step 2, §6). A request may carry its secret
//! inline; when it doesn't, the application service falls back to a
//! resolver collaborator keyed by the credentials identifier (the CUIT).
//! Failures here are business-rule errors, not infrastructure ones: a
//! missing credential is a fact about the request, not a transient fault.

use std::collections::HashMap;
use std::env;

use async_trait::async_trait;
use flow_domain::{DomainError, ErrorKind};

#[derive(Debug, Clone, thiserror::Error)]
pub enum CredentialError {
    #[error("no credential registered for identifier {0}")]
    NotFound(String),
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

impl CredentialError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CredentialError::NotFound(_) => ErrorKind::BusinessRule,
            CredentialError::Unavailable(_) => ErrorKind::TransientInfrastructure,
        }
    }
}

impl From<CredentialError> for DomainError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::NotFound(id) => DomainError::BusinessRule(format!("credential-not-found: {id}")),
            CredentialError::Unavailable(msg) => DomainError::TransientInfrastructure(msg),
        }
    }
}

/// Resolves a secret for a credentials identifier when the request didn't
/// carry one inline. Implementations own whatever decryption/lookup the
/// environment's `encryption key for credential decryption` (§6) requires;
/// this trait only sees the plaintext result.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self, identifier: &str) -> Result<String, CredentialError>;
}

/// Looks up `ARCAFLOW_CREDENTIAL_<IDENTIFIER>` in the process environment.
/// A pragmatic default for single-tenant deployments; a production
/// deployment backed by a secrets manager implements the same trait.
pub struct EnvCredentialResolver {
    prefix: String,
}

impl EnvCredentialResolver {
    pub fn new() -> Self {
        Self { prefix: "ARCAFLOW_CREDENTIAL_".to_string() }
    }

    fn env_key(&self, identifier: &str) -> String {
        format!("{}{}", self.prefix, identifier.replace(|c: char| !c.is_ascii_alphanumeric(), "_"))
    }
}

impl Default for EnvCredentialResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialResolver for EnvCredentialResolver {
    async fn resolve(&self, identifier: &str) -> Result<String, CredentialError> {
        let key = self.env_key(identifier);
        env::var(&key).map_err(|_| CredentialError::NotFound(identifier.to_string()))
    }
}

/// Never resolves anything; every request must carry its secret inline.
/// Used where no resolver is configured (`store-enabled`-style opt-out) and
/// in tests.
#[derive(Default)]
pub struct InlineOnlyCredentialResolver;

#[async_trait]
impl CredentialResolver for InlineOnlyCredentialResolver {
    async fn resolve(&self, identifier: &str) -> Result<String, CredentialError> {
        Err(CredentialError::NotFound(identifier.to_string()))
    }
}

/// In-memory resolver for tests and simulated deployments.
#[derive(Default)]
pub struct StaticCredentialResolver {
    secrets: HashMap<String, String>,
}

impl StaticCredentialResolver {
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self { secrets }
    }
}

#[async_trait]
impl CredentialResolver for StaticCredentialResolver {
    async fn resolve(&self, identifier: &str) -> Result<String, CredentialError> {
        self.secrets
            .get(identifier)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound(identifier.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inline_only_resolver_never_resolves() {
        let resolver = InlineOnlyCredentialResolver;
        let err = resolver.resolve("20429994323").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
    }

    #[tokio::test]
    async fn static_resolver_returns_registered_secret() {
        let mut secrets = HashMap::new();
        secrets.insert("20429994323".to_string(), "hunter2".to_string());
        let resolver = StaticCredentialResolver::new(secrets);
        assert_eq!(resolver.resolve("20429994323").await.unwrap(), "hunter2");
        assert!(resolver.resolve("other").await.is_err());
    }

    #[tokio::test]
    async fn unavailable_credential_classifies_as_transient() {
        let err = CredentialError::Unavailable("timeout contacting vault".into());
        assert_eq!(err.kind(), ErrorKind::TransientInfrastructure);
        let domain: DomainError = err.into();
        assert_eq!(domain.kind(), ErrorKind::TransientInfrastructure);
    }

    #[test]
    fn env_resolver_namespaces_and_sanitizes_the_lookup_key() {
        let resolver = EnvCredentialResolver::new();
        assert_eq!(resolver.env_key("20-429994323"), "ARCAFLOW_CREDENTIAL_20_429994323");
    }
}
