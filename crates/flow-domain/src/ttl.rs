use chrono::{NaiveDate, Utc};

pub const MIN_TTL_SECONDS: u64 = 300;
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// TTL for the short-lived workflow-fingerprint claim taken at intake to
/// close the race between two concurrent submissions of the same request
/// (§8 scenario 3). Deliberately much shorter than an entry's own TTL: this
/// claim exists only to arbitrate the handful of milliseconds between
/// "hash computed" and "run spawned", not to dedupe resubmissions over time
/// — that job belongs to the per-entry records, which outlive the Run.
pub const WORKFLOW_CLAIM_TTL_SECONDS: u64 = 60;

/// Per-entry TTL derived from the entry's own expiration date, clamped to a
/// 300 second minimum. An expiration date in the past still yields the
/// minimum, never zero or a negative duration.
pub fn ttl_from_expiration(expiration: NaiveDate) -> u64 {
    let now = Utc::now().date_naive();
    let days = (expiration - now).num_days();
    if days <= 0 {
        return MIN_TTL_SECONDS;
    }
    let seconds = (days as u64).saturating_mul(86_400);
    seconds.max(MIN_TTL_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn past_expiration_clamps_to_minimum() {
        let past = Utc::now().date_naive() - Duration::days(5);
        assert_eq!(ttl_from_expiration(past), MIN_TTL_SECONDS);
    }

    #[test]
    fn future_expiration_scales_with_days() {
        let future = Utc::now().date_naive() + Duration::days(10);
        assert_eq!(ttl_from_expiration(future), 10 * 86_400);
    }
}
