//! Invoker construction
//!
//! The builder collects a name, a policy, and hooks, then binds them to a unit
//! of work. One builder produces exactly one invoker of either variant.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::types::RetryPolicy;

use super::blocking::SyncInvoker;
use super::cooperative::CooperativeInvoker;
use super::failure::Failure;
use super::hooks::{HookSet, LifecycleSink};
use super::invoker::InvokerCore;

/// Builder for `SyncInvoker` and `CooperativeInvoker`
///
/// Starts with the default policy (1s delay, unbounded attempts), no hooks,
/// and no sink, so lifecycle events are dropped until a hook or sink is set.
///
/// # Example
///
/// ```rust
/// use crashloop_core::restart::{InvokerBuilder, TracingSink};
/// use crashloop_core::types::RetryPolicy;
/// use std::time::Duration;
///
/// let invoker = InvokerBuilder::new("ingest")
///     .with_policy(RetryPolicy::bounded(Duration::from_millis(5), 3))
///     .with_sink(TracingSink::new())
///     .wrap_sync(|| "42".parse::<u32>());
///
/// assert_eq!(invoker.invoke().into_value(), Some(42));
/// ```
pub struct InvokerBuilder<E> {
    name: String,
    policy: RetryPolicy,
    hooks: HookSet<E>,
}

impl<E> InvokerBuilder<E> {
    /// Create a builder for a unit of work labelled `name`
    ///
    /// The label only appears in lifecycle messages and logs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: RetryPolicy::default(),
            hooks: HookSet::new(),
        }
    }

    /// Set the restart policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override only the delay of the current policy
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.policy = self.policy.with_delay(delay);
        self
    }

    /// Override only the attempt count of the current policy
    ///
    /// Negative retries forever, zero never runs the unit of work.
    pub fn with_max_attempts(mut self, max_attempts: i64) -> Self {
        self.policy = self.policy.with_max_attempts(max_attempts);
        self
    }

    /// Replace all hooks at once
    pub fn with_hooks(mut self, hooks: HookSet<E>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set the hook fired before the first attempt
    pub fn before(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks = self.hooks.before(hook);
        self
    }

    /// Set the hook fired after the last attempt
    pub fn after(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks = self.hooks.after(hook);
        self
    }

    /// Set the hook fired on every failed attempt
    pub fn on_failure(mut self, hook: impl Fn(&Failure<E>) + Send + Sync + 'static) -> Self {
        self.hooks = self.hooks.on_failure(hook);
        self
    }

    /// Set the fallback sink for events without a specific hook
    pub fn with_sink(mut self, sink: impl LifecycleSink + 'static) -> Self {
        self.hooks = self.hooks.with_sink(sink);
        self
    }

    /// Set a fallback sink shared with the caller
    pub fn with_shared_sink(mut self, sink: Arc<dyn LifecycleSink>) -> Self {
        self.hooks = self.hooks.with_shared_sink(sink);
        self
    }

    /// Disable the fallback sink
    pub fn without_sink(mut self) -> Self {
        self.hooks = self.hooks.without_sink();
        self
    }

    /// Bind a blocking unit of work
    ///
    /// The closure is called once per attempt with whatever it captured, so
    /// every attempt sees identical inputs.
    pub fn wrap_sync<F, T>(self, unit: F) -> SyncInvoker<F, E>
    where
        F: Fn() -> Result<T, E>,
        E: fmt::Display,
    {
        SyncInvoker::new(self.into_core(), unit)
    }

    /// Bind an async unit of work
    ///
    /// `factory` is called once per attempt to build a fresh future.
    pub fn wrap_cooperative<F, Fut, T>(self, factory: F) -> CooperativeInvoker<F, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        CooperativeInvoker::new(self.into_core(), factory)
    }

    fn into_core(self) -> InvokerCore<E> {
        InvokerCore {
            name: self.name,
            policy: self.policy,
            hooks: self.hooks,
        }
    }
}

impl<E> fmt::Debug for InvokerBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokerBuilder")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restart::ResilientInvoker;
    use crate::types::AttemptLimit;

    #[test]
    fn test_builder_defaults() {
        let builder: InvokerBuilder<String> = InvokerBuilder::new("job");
        let rendered = format!("{:?}", builder);
        assert!(rendered.contains("job"));
        assert!(rendered.contains("sink: false"));

        let invoker = builder.wrap_sync(|| Ok::<_, String>(()));
        assert_eq!(invoker.policy(), &RetryPolicy::default());
        assert_eq!(invoker.name(), "job");
    }

    #[test]
    fn test_field_overrides() {
        let invoker = InvokerBuilder::new("job")
            .with_delay(Duration::from_millis(15))
            .with_max_attempts(4)
            .wrap_sync(|| Ok::<_, String>(()));

        assert_eq!(invoker.policy().delay(), Duration::from_millis(15));
        assert_eq!(invoker.policy().limit(), AttemptLimit::Limited(4));
    }

    #[test]
    fn test_policy_then_override() {
        let invoker = InvokerBuilder::new("job")
            .with_policy(RetryPolicy::bounded(Duration::from_millis(100), 2))
            .with_max_attempts(-1)
            .wrap_sync(|| Ok::<_, String>(()));

        assert_eq!(invoker.policy().delay(), Duration::from_millis(100));
        assert!(invoker.policy().limit().is_unbounded());
    }
}
