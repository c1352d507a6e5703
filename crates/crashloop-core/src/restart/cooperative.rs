//! Cooperative restart loop
//!
//! The async counterpart of [`SyncInvoker`](super::SyncInvoker). It suspends
//! at exactly two points: while awaiting an attempt, and while waiting out
//! the delay between attempts. The delay is a tokio timer, so other tasks on
//! the same runtime thread keep running during it.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::types::RetryPolicy;

use super::blocking::state_label;
use super::failure::{Failure, Outcome};
use super::invoker::{InvokerCore, ResilientInvoker};

/// Restart-on-failure wrapper around an async unit of work
///
/// Holds a factory rather than a future: a future is single-use, so every
/// attempt builds a fresh one. Build one with
/// [`InvokerBuilder::wrap_cooperative`](super::InvokerBuilder::wrap_cooperative).
pub struct CooperativeInvoker<F, E> {
    core: InvokerCore<E>,
    factory: F,
}

impl<F, E> CooperativeInvoker<F, E> {
    pub(crate) fn new(core: InvokerCore<E>, factory: F) -> Self {
        Self { core, factory }
    }
}

impl<F, Fut, T, E> CooperativeInvoker<F, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    /// Run the unit of work until it succeeds or the policy is exhausted
    pub async fn invoke(&self) -> Outcome<T> {
        let token = CancellationToken::new();
        self.invoke_with_cancel(&token).await
    }

    /// Run the unit of work until success, exhaustion, or cancellation
    ///
    /// The token is checked before each attempt and raced against the delay.
    /// An attempt that is already running is awaited to completion.
    pub async fn invoke_with_cancel(&self, cancel: &CancellationToken) -> Outcome<T> {
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

            // The factory call sits inside the guarded future so a panic while
            // building the attempt is caught like one raised while running it.
            let result = AssertUnwindSafe(async { (self.factory)().await })
                .catch_unwind()
                .await;

            match result {
                Ok(Ok(value)) => {
                    break Outcome::Succeeded {
                        value,
                        attempts: attempt,
                    }
                }
                Ok(Err(err)) => core.attempt_failed(attempt, &Failure::Error(err)),
                Err(payload) => core.attempt_failed(attempt, &Failure::from_panic(payload)),
            }

            // No pause after the final permitted attempt
            if !counter.has_remaining() {
                continue;
            }

            if delay.is_zero() {
                // Still hand control back so a failing unit cannot starve the runtime
                tokio::task::yield_now().await;
                continue;
            }

            let cancelled = tokio::select! {
                () = tokio::time::sleep(delay) => false,
                () = cancel.cancelled() => true,
            };
            if cancelled {
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

impl<F, Fut, T, E> ResilientInvoker for CooperativeInvoker<F, E>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send,
{
    type Output = T;
    type Invocation<'a>
        = BoxFuture<'a, Outcome<T>>
    where
        Self: 'a;

    fn name(&self) -> &str {
        &self.core.name
    }

    fn policy(&self) -> &RetryPolicy {
        &self.core.policy
    }

    fn invoke_with_cancel<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Outcome<T>> {
        CooperativeInvoker::invoke_with_cancel(self, cancel).boxed()
    }
}

impl<F, E> fmt::Debug for CooperativeInvoker<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CooperativeInvoker")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}
