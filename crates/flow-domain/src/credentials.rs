use serde::{Deserialize, Serialize};

/// Credential handle carried by a Request. The secret, if present inline, is
/// used as-is; otherwise the application service consults a credential
/// resolver collaborator (out of core scope, see flow-adapters).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub cuit: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    /// Stable identifier used as the first field of the workflow fingerprint.
    /// Never includes the secret itself.
    pub fn identifier(&self) -> &str {
        &self.cuit
    }

    pub fn has_inline_secret(&self) -> bool {
        matches!(&self.password, Some(p) if !p.trim().is_empty())
    }
}
