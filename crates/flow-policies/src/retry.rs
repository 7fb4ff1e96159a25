//! Retry eligibility: a pure decision over a stored record's recorded
//! failure kinds and retry budget (§4.10, §7, §8 "Retry classifier given
//! any non-Exception object -> false"). Classification never inspects
//! `errors`' free-text messages — only `error_kinds`, the step engine's own
//! tag for what kind of thing failed (§9 "Retryability... by error kind
//! only").

use flow_store::TransactionRecord;

/// Why a record was or wasn't picked up by a retry sweep, carried for
/// logging and auditing rather than discarded once the boolean verdict
/// is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    NotFailed,
    RetryBudgetExhausted { retry_count: u32, max_retries: u32 },
    NoRetryableError,
    Eligible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryDecision {
    pub eligible: bool,
    pub reason: RetryReason,
}

/// Decides whether `record` is eligible for an automatic retry under
/// `max_retries`. A record is eligible iff its status is `FAILED`, its
/// `retry_count` is still under budget, and at least one of its recorded
/// step failures is classified as retryable (transient infrastructure).
pub fn evaluate(record: &TransactionRecord, max_retries: u32) -> RetryDecision {
    use flow_domain::RunStatus;

    if record.status != RunStatus::Failed {
        return RetryDecision { eligible: false, reason: RetryReason::NotFailed };
    }
    if record.retry_count >= max_retries {
        return RetryDecision { eligible: false,
                                reason: RetryReason::RetryBudgetExhausted { retry_count: record.retry_count,
                                                                            max_retries } };
    }
    if !record.has_retryable_error() {
        return RetryDecision { eligible: false, reason: RetryReason::NoRetryableError };
    }
    RetryDecision { eligible: true, reason: RetryReason::Eligible }
}
