use serde::{Deserialize, Serialize};

use crate::DomainError;

/// A named step graph. W-A spawns one background run per entry sharing a
/// single `run_id`; W-B spawns a single run carrying the whole entry list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowKind {
    /// "account-reconciliation" — multi-run kind.
    AccountReconciliation,
    /// "declaration-upload" — single-run kind.
    DeclarationUpload,
}

impl WorkflowKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowKind::AccountReconciliation => "W-A",
            WorkflowKind::DeclarationUpload => "W-B",
        }
    }

    pub fn route_segment(self) -> &'static str {
        match self {
            WorkflowKind::AccountReconciliation => "account-reconciliation",
            WorkflowKind::DeclarationUpload => "declaration-upload",
        }
    }

    pub fn spawns_one_run_per_entry(self) -> bool {
        matches!(self, WorkflowKind::AccountReconciliation)
    }

    pub fn from_route_segment(s: &str) -> Result<Self, DomainError> {
        match s {
            "account-reconciliation" => Ok(WorkflowKind::AccountReconciliation),
            "declaration-upload" => Ok(WorkflowKind::DeclarationUpload),
            other => Err(DomainError::Validation(format!("unknown workflow kind: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_segment_round_trips() {
        for k in [WorkflowKind::AccountReconciliation, WorkflowKind::DeclarationUpload] {
            assert_eq!(WorkflowKind::from_route_segment(k.route_segment()).unwrap(), k);
        }
    }
}
