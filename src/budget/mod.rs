//! Shared per-request time budget and the retry combinator.
//!
//! Every network stage of the cascade draws from one [`TimeBudget`]. The
//! budget is deadline-based, so `remaining()` is monotonically non-increasing
//! within a request; a stage that burns time on retries hands a smaller, never
//! a reset, budget to the next stage. Local stages (alias table, cache) do not
//! consult the budget at all.


use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Pause between retry attempts, capped by the remaining budget.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Default per-request budget when the caller supplies no `timeout_ms`.
pub const DEFAULT_REQUEST_BUDGET: Duration = Duration::from_millis(4_000);

/// Depleting time budget threaded through one request's cascade.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    deadline: Instant,
    total: Duration,
}

impl TimeBudget {
    pub fn new(total: Duration) -> Self {
        Self {
            deadline: Instant::now() + total,
            total,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Time left before the request deadline.
    #[inline]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_zero()
    }

    /// The budget the request started with.
    #[inline]
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Timeout to hand a single call: the remaining budget, optionally capped.
    pub fn stage_timeout(&self, cap: Option<Duration>) -> Duration {
        match cap {
            Some(cap) => self.remaining().min(cap),
            None => self.remaining(),
        }
    }
}

/// Errors that may be retried without giving up on the stage.
pub trait Transient {
    /// Returns `true` for 5xx-style and timeout failures.
    fn is_transient(&self) -> bool;
}

/// Result of [`with_retry`]: the final attempt's outcome plus bookkeeping for
/// the stage's `SourceOutcome`.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Runs `op` up to `max_attempts` times against the shared budget.
///
/// Each attempt receives the *current* remaining budget as its timeout, so a
/// slow first attempt leaves less room for the second. Only transient errors
/// are retried; permanent errors and successes return immediately. The
/// combinator always runs at least one attempt — an already-exhausted budget
/// surfaces as the attempt's own timeout.
pub async fn with_retry<T, E, F, Fut>(
    budget: &TimeBudget,
    max_attempts: u32,
    mut op: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient,
{
    let started = Instant::now();
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let result = op(budget.remaining()).await;

        match result {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts,
                    elapsed: started.elapsed(),
                };
            }
            Err(e) => {
                let retryable =
                    e.is_transient() && attempts < max_attempts && !budget.is_exhausted();
                if !retryable {
                    return RetryOutcome {
                        result: Err(e),
                        attempts,
                        elapsed: started.elapsed(),
                    };
                }
                debug!(attempt = attempts, max_attempts, "transient failure, backing off");
                tokio::time::sleep(RETRY_BACKOFF.min(budget.remaining())).await;
            }
        }
    }
}
