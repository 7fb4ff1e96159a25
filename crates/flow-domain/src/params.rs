//! Typed per-kind workflow parameters (§9 "dynamic params filtering"
//! redesign note). Built once at the intake boundary from a validated
//! [`crate::Request`] and handed to the step engine via the run context;
//! step handlers never see the raw request JSON, only their kind's struct.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Credentials, DeclarationEntry, PaymentMethod, ReconciliationEntry};

/// One W-A ("account-reconciliation") launch. W-A spawns one run per entry
/// sharing a single `run_id`, so each launch carries exactly one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationParams {
    pub run_id: Uuid,
    pub credentials: Credentials,
    pub period_from: String,
    pub period_to: String,
    pub calculation_date: String,
    pub form_payment: PaymentMethod,
    pub expiration_date: String,
    pub taxpayer_type: Option<String>,
    pub tax_type: Option<String>,
    pub include_interests: bool,
}

impl ReconciliationParams {
    pub fn new(run_id: Uuid, credentials: Credentials, entry: &ReconciliationEntry) -> Self {
        Self { run_id,
               credentials,
               period_from: entry.period_from.clone(),
               period_to: entry.period_to.clone(),
               calculation_date: entry.calculation_date.clone(),
               form_payment: entry.form_payment,
               expiration_date: entry.expiration_date.clone(),
               taxpayer_type: entry.taxpayer_type.clone(),
               tax_type: entry.tax_type.clone(),
               include_interests: entry.include_interests }
    }
}

/// One W-B ("declaration-upload") launch. W-B spawns a single run carrying
/// the whole entry list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationParams {
    pub run_id: Uuid,
    pub credentials: Credentials,
    pub entries: Vec<DeclarationEntry>,
}

impl DeclarationParams {
    pub fn new(run_id: Uuid, credentials: Credentials, entries: Vec<DeclarationEntry>) -> Self {
        Self { run_id, credentials, entries }
    }
}
