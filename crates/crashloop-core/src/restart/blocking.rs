//! Blocking restart loop
//!
//! Runs entirely on the calling thread. The inter-attempt delay parks that
//! thread, so this variant belongs on a dedicated worker thread and never on
//! an async executor thread.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::types::RetryPolicy;

use super::failure::{Failure, Outcome};
use super::invoker::{InvokerCore, ResilientInvoker};

/// Longest uninterrupted sleep while waiting between attempts
///
/// Bounds how late a cancellation is noticed during the delay.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Restart-on-failure wrapper around a blocking unit of work
///
/// Build one with [`InvokerBuilder::wrap_sync`](super::InvokerBuilder::wrap_sync).
pub struct SyncInvoker<F, E> {
    core: InvokerCore<E>,
    unit: F,
}

impl<F, E> SyncInvoker<F, E> {
    pub(crate) fn new(core: InvokerCore<E>, unit: F) -> Self {
        Self { core, unit }
    }
}

impl<F, T, E> SyncInvoker<F, E>
where
    F: Fn() -> Result<T, E>,
    E: fmt::Display,
{
    /// Run the unit of work until it succeeds or the policy is exhausted
    ///
    /// With an unbounded policy and a permanently failing unit this never
    /// returns; use [`invoke_with_cancel`](Self::invoke_with_cancel) when the
    /// loop must be stoppable.
    pub fn invoke(&self) -> Outcome<T> {
        self.invoke_with_cancel(&CancellationToken::new())
    }

    /// Run the unit of work until success, exhaustion, or cancellation
    ///
    /// The token is checked before each attempt and throughout the delay. It
    /// is never observed while the unit of work itself is running.
    pub fn invoke_with_cancel(&self, cancel: &CancellationToken) -> Outcome<T> {
        let core = &self.core;
        let delay = core.policy.delay();
        let mut counter = core.counter();

        core.begin_invocation();

        let outcome = loop {
            if !counter.has_remaining() {
                break Outcome::Exhausted {
                    attempts: counter.used(),
                };
            }
            if cancel.is_cancelled() {
                break Outcome::Cancelled {
                    attempts: counter.used(),
                };
            }

            let attempt = counter.begin();
            core.attempt_started(&counter, attempt);

            let failure = match panic::catch_unwind(AssertUnwindSafe(|| (self.unit)())) {
                Ok(Ok(value)) => {
                    break Outcome::Succeeded {
                        value,
                        attempts: attempt,
                    }
                }
                Ok(Err(err)) => Failure::Error(err),
                Err(payload) => Failure::from_panic(payload),
            };
            core.attempt_failed(attempt, &failure);

            // No pause after the final permitted attempt
            if !counter.has_remaining() {
                continue;
            }

            if !wait_unless_cancelled(delay, cancel) {
                break Outcome::Cancelled { attempts: attempt };
            }
            tracing::trace!(operation = %core.name, attempt = attempt, "restart delay elapsed");
        };

        if outcome.is_cancelled() {
            core.cancelled(outcome.attempts());
        }
        core.end_invocation(outcome.attempts(), state_label(&outcome));

        outcome
    }
}

impl<F, T, E> ResilientInvoker for SyncInvoker<F, E>
where
    F: Fn() -> Result<T, E>,
    E: fmt::Display,
{
    type Output = T;
    type Invocation<'a>
        = Outcome<T>
    where
        Self: 'a;

    fn name(&self) -> &str {
        &self.core.name
    }

    fn policy(&self) -> &RetryPolicy {
        &self.core.policy
    }

    fn invoke_with_cancel<'a>(&'a self, cancel: &'a CancellationToken) -> Outcome<T> {
        SyncInvoker::invoke_with_cancel(self, cancel)
    }
}

impl<F, E> fmt::Debug for SyncInvoker<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncInvoker")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

/// Park the thread for `delay`, waking early if `cancel` fires
///
/// Returns `false` when cancelled.
fn wait_unless_cancelled(delay: Duration, cancel: &CancellationToken) -> bool {
    // An unrepresentable deadline means "wait until cancelled"
    let deadline = Instant::now().checked_add(delay);

    loop {
        if cancel.is_cancelled() {
            return false;
        }

        let slice = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return true;
                }
                (deadline - now).min(CANCEL_POLL_INTERVAL)
            }
            None => CANCEL_POLL_INTERVAL,
        };
        thread::sleep(slice);
    }
}

pub(crate) fn state_label<T>(outcome: &Outcome<T>) -> &'static str {
    match outcome {
        Outcome::Succeeded { .. } => "succeeded",
        Outcome::Exhausted { .. } => "exhausted",
        Outcome::Cancelled { .. } => "cancelled",
    }
}
