//! A deterministic [`BrowserDriver`] used by tests and as the default
//! wiring for environments with no real portal RPC layer configured. It
//! never touches a network or a real browser; every call succeeds with a
//! fixed, predictable payload, letting the full pipeline be exercised
//! before a real provider is wired in.

use flow_domain::DomainError;

use crate::browser::{BrowserArtifact, BrowserDriver};

#[derive(Debug, Default)]
pub struct SimulatedBrowserDriver;

impl BrowserDriver for SimulatedBrowserDriver {
    fn login(&self, cuit: &str, _password: &str) -> Result<(), DomainError> {
        if cuit.trim().is_empty() {
            return Err(DomainError::BusinessRule("cuit is required to authenticate".into()));
        }
        Ok(())
    }

    fn navigate_module(&self, _module: &str) -> Result<(), DomainError> {
        Ok(())
    }

    fn enter_period(&self, _period_from: &str, _period_to: &str) -> Result<(), DomainError> {
        Ok(())
    }

    fn calculate(&self) -> Result<(), DomainError> {
        Ok(())
    }

    fn extract_result(&self) -> Result<serde_json::Value, DomainError> {
        Ok(serde_json::json!({"amount": "0.00", "currency": "ARS"}))
    }

    fn capture_screenshot(&self) -> Result<BrowserArtifact, DomainError> {
        Ok(BrowserArtifact { filename: "screenshot.png".into(),
                              content_type: "image/png".into(),
                              bytes: b"simulated-png".to_vec() })
    }

    fn open_declaration_form(&self) -> Result<(), DomainError> {
        Ok(())
    }

    fn upload_entries(&self, entry_count: usize) -> Result<(), DomainError> {
        if entry_count == 0 {
            return Err(DomainError::BusinessRule("no entries to upload".into()));
        }
        Ok(())
    }

    fn submit(&self) -> Result<String, DomainError> {
        Ok("ack-simulated".into())
    }

    fn generate_payment_voucher(&self) -> Result<BrowserArtifact, DomainError> {
        Ok(BrowserArtifact { filename: "voucher.pdf".into(),
                              content_type: "application/pdf".into(),
                              bytes: b"simulated-pdf".to_vec() })
    }

    fn attach_qr(&self) -> Result<BrowserArtifact, DomainError> {
        Ok(BrowserArtifact { filename: "qr.png".into(),
                              content_type: "image/png".into(),
                              bytes: b"simulated-qr".to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_rejects_blank_cuit() {
        let driver = SimulatedBrowserDriver;
        assert!(driver.login("", "p").is_err());
        assert!(driver.login("20429994323", "p").is_ok());
    }

    #[test]
    fn upload_entries_rejects_empty_batch() {
        let driver = SimulatedBrowserDriver;
        assert!(driver.upload_entries(0).is_err());
        assert!(driver.upload_entries(3).is_ok());
    }
}
