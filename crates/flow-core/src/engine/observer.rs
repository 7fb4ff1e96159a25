//! Observer hook the step engine calls into for metrics (C9). Kept as a
//! trait rather than a direct dependency on a metrics crate so this engine
//! crate stays free of any particular exporter; the application layer
//! supplies the concrete sink.

use std::time::Duration;

/// Outcome tags the engine reports per step, matching §4.8's
/// {success, failed, retry} per-workflow per-step counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    Retry,
    Failed,
    Skipped,
}

pub trait StepObserver: Send + Sync {
    fn on_step(&self, workflow: &str, step: &str, outcome: StepOutcome, duration: Duration);
}

/// Default observer used when the caller does not need metrics (e.g. unit
/// tests of the engine itself).
pub struct NoopObserver;

impl StepObserver for NoopObserver {
    fn on_step(&self, _workflow: &str, _step: &str, _outcome: StepOutcome, _duration: Duration) {}
}
