//! Step-engine defaults shared across workflow kinds.

/// Default number of attempts for a step that doesn't override
/// `retry_count` (§3 "Workflow").
pub const DEFAULT_STEP_RETRY_COUNT: u32 = 3;

/// Default advisory timeout for a step that doesn't override
/// `timeout_seconds`.
pub const DEFAULT_STEP_TIMEOUT_SECONDS: u64 = 300;

/// Default number of attempts the retry sweeper (C11) allows before giving
/// up on a Run, unless the caller overrides it via the retry endpoint.
pub const DEFAULT_MAX_RUN_RETRIES: u32 = 3;
