//! Per-Run correlation identifier (C1), propagated across logs, metrics,
//! and events without ever becoming a process-global.
//!
//! Carried as a `tokio::task_local!` value. An RAII guard saves the prior
//! value on entry and restores it on drop, so nested scopes (a monitor task
//! awaiting a run it didn't spawn, for instance) never leak into each
//! other. Code that wants the identifier purely for a synchronous log line
//! reads [`current`], which returns `"-"` when no scope is active.

use std::cell::RefCell;

tokio::task_local! {
    static CORRELATION_ID: RefCell<String>;
}

/// Default value reported when no correlation scope is active.
pub const NONE: &str = "-";

/// Reads the correlation id active in the current task, or [`NONE`].
pub fn current() -> String {
    CORRELATION_ID.try_with(|id| id.borrow().clone()).unwrap_or_else(|_| NONE.to_string())
}

/// Runs `fut` with `run_id` set as the active correlation id for its whole
/// lifetime. If a scope is already active (nested call), the previous value
/// resumes being visible once `fut` completes.
pub async fn scoped<F, T>(run_id: impl Into<String>, fut: F) -> T
    where F: std::future::Future<Output = T>
{
    CORRELATION_ID.scope(RefCell::new(run_id.into()), fut).await
}
