use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification used by retry/transport mapping. Never derive this
/// from an error's message text — only from which variant it is. Carries a
/// stable tag (`as_str`/`FromStr`) so stores can persist *which kind* an
/// error was without persisting (or later parsing) its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    DuplicateTransaction,
    BusinessRule,
    TransientInfrastructure,
    SystemFatal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::DuplicateTransaction => "duplicate_transaction",
            ErrorKind::BusinessRule => "business_rule",
            ErrorKind::TransientInfrastructure => "transient_infrastructure",
            ErrorKind::SystemFatal => "system_fatal",
        }
    }

    /// Retryable per §7's taxonomy: transient infrastructure only.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::TransientInfrastructure)
    }
}

impl std::str::FromStr for ErrorKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validation" => Ok(ErrorKind::Validation),
            "duplicate_transaction" => Ok(ErrorKind::DuplicateTransaction),
            "business_rule" => Ok(ErrorKind::BusinessRule),
            "transient_infrastructure" => Ok(ErrorKind::TransientInfrastructure),
            "system_fatal" => Ok(ErrorKind::SystemFatal),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum DomainError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("duplicate transaction: {existing_run_id}")]
    DuplicateTransaction { existing_run_id: String },

    #[error("business rule violated: {0}")]
    BusinessRule(String),

    #[error("transient infrastructure error: {0}")]
    TransientInfrastructure(String),

    #[error("system fatal error: {0}")]
    SystemFatal(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::DuplicateTransaction { .. } => ErrorKind::DuplicateTransaction,
            DomainError::BusinessRule(_) => ErrorKind::BusinessRule,
            DomainError::TransientInfrastructure(_) => ErrorKind::TransientInfrastructure,
            DomainError::SystemFatal(_) => ErrorKind::SystemFatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransientInfrastructure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant_not_message() {
        let e = DomainError::TransientInfrastructure("connection refused".into());
        assert_eq!(e.kind(), ErrorKind::TransientInfrastructure);
        assert!(e.is_retryable());

        let e = DomainError::Validation("connection refused".into());
        assert_eq!(e.kind(), ErrorKind::Validation);
        assert!(!e.is_retryable());
    }
}
