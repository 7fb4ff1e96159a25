//! The browser-driver interface (§1: "concrete browser-driver RPCs" and
//! "the concrete tax-portal DOM scripts" are out of scope for the core,
//! reduced here to one narrow, synchronous collaborator trait). Step
//! handlers are generic over this trait so the actual RPC/DOM-scripting
//! layer can be swapped without touching workflow wiring.

use flow_domain::DomainError;

/// A structured artifact a portal step produced (a rendered PDF/QR, a
/// screenshot). Kept as raw bytes plus a content type; base64 encoding
/// into the results envelope happens at the boundary, not here.
#[derive(Debug, Clone)]
pub struct BrowserArtifact {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Narrow synchronous RPCs each step in W-A/W-B drives. One call per
/// concern, named after the portal action it performs rather than after
/// any particular DOM shape.
pub trait BrowserDriver: Send + Sync {
    fn login(&self, cuit: &str, password: &str) -> Result<(), DomainError>;
    fn navigate_module(&self, module: &str) -> Result<(), DomainError>;
    fn enter_period(&self, period_from: &str, period_to: &str) -> Result<(), DomainError>;
    fn calculate(&self) -> Result<(), DomainError>;
    fn extract_result(&self) -> Result<serde_json::Value, DomainError>;
    fn capture_screenshot(&self) -> Result<BrowserArtifact, DomainError>;

    fn open_declaration_form(&self) -> Result<(), DomainError>;
    fn upload_entries(&self, entry_count: usize) -> Result<(), DomainError>;
    fn submit(&self) -> Result<String, DomainError>;
    fn generate_payment_voucher(&self) -> Result<BrowserArtifact, DomainError>;
    fn attach_qr(&self) -> Result<BrowserArtifact, DomainError>;
}
