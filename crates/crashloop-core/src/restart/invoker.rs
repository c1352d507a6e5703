//! Shared invoker surface
//!
//! `SyncInvoker` and `CooperativeInvoker` implement the same contract but
//! differ in what an invocation *is*: a finished `Outcome` for the blocking
//! variant, a future resolving to one for the cooperative variant.

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::types::RetryPolicy;

use super::attempts::AttemptCounter;
use super::failure::Failure;
use super::hooks::HookSet;

/// Common interface of the restart-on-failure invokers
///
/// Callers pick the implementation matching their execution model: a
/// dedicated thread gets `SyncInvoker`, a tokio task gets
/// `CooperativeInvoker`.
///
/// # Example
///
/// ```rust
/// use crashloop_core::restart::{InvokerBuilder, ResilientInvoker};
/// use crashloop_core::types::RetryPolicy;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// fn describe<I: ResilientInvoker>(invoker: &I) -> String {
///     format!("{} (max attempts {})", invoker.name(), invoker.policy().max_attempts())
/// }
///
/// let invoker = InvokerBuilder::new("heartbeat")
///     .with_policy(RetryPolicy::bounded(Duration::from_millis(10), 2))
///     .wrap_sync(|| Ok::<_, std::io::Error>(1));
///
/// assert_eq!(describe(&invoker), "heartbeat (max attempts 2)");
/// let outcome = invoker.invoke_with_cancel(&CancellationToken::new());
/// assert_eq!(outcome.into_value(), Some(1));
/// ```
pub trait ResilientInvoker {
    /// Value produced by a successful attempt
    type Output;

    /// What a call to `invoke_with_cancel` hands back
    type Invocation<'a>
    where
        Self: 'a;

    /// Diagnostic label of the wrapped unit of work
    fn name(&self) -> &str;

    /// Policy this invoker was built from
    fn policy(&self) -> &RetryPolicy;

    /// Run the restart loop until success, exhaustion, or cancellation
    fn invoke_with_cancel<'a>(&'a self, cancel: &'a CancellationToken) -> Self::Invocation<'a>;
}

/// Configuration shared by both invoker variants
pub(crate) struct InvokerCore<E> {
    pub(crate) name: String,
    pub(crate) policy: RetryPolicy,
    pub(crate) hooks: HookSet<E>,
}

impl<E> InvokerCore<E> {
    pub(crate) fn counter(&self) -> AttemptCounter {
        AttemptCounter::new(self.policy.limit())
    }

    pub(crate) fn begin_invocation(&self) {
        tracing::debug!(
            operation = %self.name,
            max_attempts = self.policy.max_attempts(),
            delay_ms = self.policy.delay().as_millis() as u64,
            "invocation started"
        );
        self.hooks.fire_before(&self.name);
    }

    pub(crate) fn end_invocation(&self, attempts: u32, state: &'static str) {
        self.hooks.fire_after(&self.name);
        tracing::debug!(
            operation = %self.name,
            attempts = attempts,
            state = state,
            "invocation finished"
        );
    }

    pub(crate) fn attempt_started(&self, counter: &AttemptCounter, attempt: u32) {
        tracing::debug!(
            operation = %self.name,
            attempt = attempt,
            max_attempts = ?counter.ceiling(),
            "starting attempt"
        );
    }

    pub(crate) fn attempt_failed(&self, attempt: u32, failure: &Failure<E>)
    where
        E: fmt::Display,
    {
        tracing::debug!(
            operation = %self.name,
            attempt = attempt,
            error = %failure,
            "attempt failed"
        );
        self.hooks.fire_failure(&self.name, failure);
    }

    pub(crate) fn cancelled(&self, attempts: u32) {
        tracing::warn!(
            operation = %self.name,
            attempts = attempts,
            "restart loop cancelled"
        );
    }
}

impl<E> fmt::Debug for InvokerCore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokerCore")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("hooks", &self.hooks)
            .finish()
    }
}
