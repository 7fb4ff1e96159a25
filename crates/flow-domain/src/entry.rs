use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{DomainError, PaymentMethod};

/// Common contract every entry kind provides to the fingerprinting and TTL
/// machinery. Implementors never need to be hashed directly — the engine
/// only ever sees the already-canonicalized field list.
pub trait FingerprintFields {
    /// Critical fields in the fixed canonical order for this entry's
    /// workflow kind, already formatted as strings (fixed two-decimal form
    /// for floats). Optional fields are included only when present.
    fn canonical_fields(&self) -> Vec<String>;

    /// The date this entry's work item expires, used to derive the Run TTL.
    fn expiration_date(&self) -> Result<NaiveDate, DomainError>;
}

/// Entry for the W-A ("account-reconciliation") workflow kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationEntry {
    pub period_from: String,
    pub period_to: String,
    pub calculation_date: String,
    pub form_payment: PaymentMethod,
    pub expiration_date: String,
    #[serde(default)]
    pub taxpayer_type: Option<String>,
    #[serde(default)]
    pub tax_type: Option<String>,
    #[serde(default)]
    pub include_interests: bool,
}

impl ReconciliationEntry {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.period_from.trim().is_empty() || self.period_to.trim().is_empty() {
            return Err(DomainError::Validation("period_from/period_to are required".into()));
        }
        if self.calculation_date.trim().is_empty() {
            return Err(DomainError::Validation("calculation_date is required".into()));
        }
        NaiveDate::parse_from_str(&self.expiration_date, "%d/%m/%Y")
            .map_err(|_| DomainError::Validation("expiration_date must be DD/MM/YYYY".into()))?;
        Ok(())
    }
}

impl FingerprintFields for ReconciliationEntry {
    fn canonical_fields(&self) -> Vec<String> {
        let mut fields = vec![self.period_from.clone(), self.period_to.clone(), self.calculation_date.clone()];
        if let Some(t) = &self.taxpayer_type {
            fields.push(t.clone());
        }
        if let Some(t) = &self.tax_type {
            fields.push(t.clone());
        }
        fields.push(self.form_payment.as_str().to_string());
        fields.push(self.expiration_date.clone());
        fields
    }

    fn expiration_date(&self) -> Result<NaiveDate, DomainError> {
        NaiveDate::parse_from_str(&self.expiration_date, "%d/%m/%Y")
            .map_err(|_| DomainError::Validation("expiration_date must be DD/MM/YYYY".into()))
    }
}

/// Entry for the W-B ("declaration-upload") workflow kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationEntry {
    pub expiration_date: String,
    pub form_number: String,
    pub payment_type_code: String,
    pub cuit: String,
    pub concept: String,
    pub sub_concept: String,
    pub fiscal_period: String,
    pub amount: f64,
    pub tax_code: String,
    pub form_payment: PaymentMethod,
}

impl DeclarationEntry {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.amount <= 0.0 {
            return Err(DomainError::Validation("amount must be > 0".into()));
        }
        if self.concept.trim().is_empty() || self.sub_concept.trim().is_empty() {
            return Err(DomainError::Validation("concept/sub_concept are required".into()));
        }
        NaiveDate::parse_from_str(&self.expiration_date, "%Y-%m-%d")
            .map_err(|_| DomainError::Validation("expiration_date must be YYYY-MM-DD".into()))?;
        Ok(())
    }
}

impl FingerprintFields for DeclarationEntry {
    fn canonical_fields(&self) -> Vec<String> {
        vec![
            self.cuit.clone(),
            self.concept.clone(),
            self.sub_concept.clone(),
            self.fiscal_period.clone(),
            format!("{:.2}", self.amount),
            self.tax_code.clone(),
            self.expiration_date.clone(),
            self.form_number.clone(),
            self.payment_type_code.clone(),
        ]
    }

    fn expiration_date(&self) -> Result<NaiveDate, DomainError> {
        NaiveDate::parse_from_str(&self.expiration_date, "%Y-%m-%d")
            .map_err(|_| DomainError::Validation("expiration_date must be YYYY-MM-DD".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconciliation_canonical_fields_include_optionals_only_when_present() {
        let minimal = ReconciliationEntry {
            period_from: "01/2023".into(),
            period_to: "12/2025".into(),
            calculation_date: "15/09/2025".into(),
            form_payment: PaymentMethod::Qr,
            expiration_date: "31/12/2025".into(),
            taxpayer_type: None,
            tax_type: None,
            include_interests: false,
        };
        assert_eq!(minimal.canonical_fields(),
                   vec!["01/2023", "12/2025", "15/09/2025", "qr", "31/12/2025"]);

        let with_optionals = ReconciliationEntry { taxpayer_type: Some("responsable_inscripto".into()),
                                                     tax_type: Some("iva".into()),
                                                     ..minimal };
        assert_eq!(with_optionals.canonical_fields(),
                   vec!["01/2023", "12/2025", "15/09/2025", "responsable_inscripto", "iva", "qr",
                        "31/12/2025"]);
    }

    #[test]
    fn declaration_amount_is_fixed_two_decimals() {
        let e = DeclarationEntry { expiration_date: "2025-12-31".into(),
                                    form_number: "F.900".into(),
                                    payment_type_code: "17".into(),
                                    cuit: "20429994323".into(),
                                    concept: "019".into(),
                                    sub_concept: "019".into(),
                                    fiscal_period: "202512".into(),
                                    amount: 1500.5,
                                    tax_code: "217".into(),
                                    form_payment: PaymentMethod::Link };
        assert_eq!(e.canonical_fields()[4], "1500.50");
        assert!(e.validate().is_ok());
    }

    #[test]
    fn declaration_rejects_non_positive_amount() {
        let mut e = DeclarationEntry { expiration_date: "2025-12-31".into(),
                                        form_number: "F.900".into(),
                                        payment_type_code: "17".into(),
                                        cuit: "20429994323".into(),
                                        concept: "019".into(),
                                        sub_concept: "019".into(),
                                        fiscal_period: "202512".into(),
                                        amount: 0.0,
                                        tax_code: "217".into(),
                                        form_payment: PaymentMethod::Link };
        assert!(e.validate().is_err());
        e.amount = -5.0;
        assert!(e.validate().is_err());
    }
}
