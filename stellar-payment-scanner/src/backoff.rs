//! Wait strategies used while a ledger has not closed yet.

use std::time::Duration;

/// Decides how long to wait before asking for the same ledger again.
pub trait BackoffStrategy: Send {
    /// Delay before retry number `attempt` (starting at 1).
    fn delay(&self, attempt: u32) -> Duration;
}

/// Delay grows by `step` per attempt, up to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    step: Duration,
    max: Duration,
}

impl LinearBackoff {
    /// Create a linear backoff.
    pub fn new(step: Duration, max: Duration) -> Self {
        Self {
            step,
            max: max.max(step),
        }
    }
}

impl BackoffStrategy for LinearBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt.max(1)).min(self.max)
    }
}

/// Same delay every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedBackoff(pub Duration);

impl BackoffStrategy for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}
