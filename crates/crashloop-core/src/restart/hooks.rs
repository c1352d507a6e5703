//! Lifecycle hooks and fallback sinks
//!
//! Every invocation reports three kinds of lifecycle event: starting, ending,
//! and a caught failure. Each event goes to its specific hook when one is set,
//! otherwise to the fallback sink as a descriptive string, otherwise nowhere.
//!
//! Hooks and sinks are trusted code. A panic inside one unwinds straight to
//! the caller of `invoke`; the invoker does not intercept it.

use std::fmt;
use std::sync::{Arc, Mutex};

use super::failure::Failure;

/// Nullary lifecycle callback (before / after)
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Callback receiving each failure
pub type FailureHook<E> = Arc<dyn Fn(&Failure<E>) + Send + Sync>;

/// Receiver for lifecycle strings when no specific hook is set
///
/// Implemented for any `Fn(&str) + Send + Sync` closure.
///
/// # Example
///
/// ```rust
/// use crashloop_core::restart::LifecycleSink;
///
/// struct StderrSink;
///
/// impl LifecycleSink for StderrSink {
///     fn emit(&self, message: &str) {
///         eprintln!("{}", message);
///     }
/// }
/// ```
pub trait LifecycleSink: Send + Sync {
    /// Receive one lifecycle message
    fn emit(&self, message: &str);
}

impl<F> LifecycleSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn emit(&self, message: &str) {
        self(message)
    }
}

/// A sink that forwards lifecycle messages to `tracing` at INFO level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Create a new tracing sink
    pub fn new() -> Self {
        Self
    }
}

impl LifecycleSink for TracingSink {
    fn emit(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

/// A sink that records every message it receives
///
/// Useful for testing and for surfacing lifecycle history in diagnostics.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    /// Create an empty recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded messages, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of recorded messages starting with `prefix`
    pub fn count_with_prefix(&self, prefix: &str) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|m| m.starts_with(prefix))
            .count()
    }
}

impl LifecycleSink for RecordingSink {
    fn emit(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.to_string());
    }
}

/// A lifecycle event, rendered to a sink message when no hook handles it
pub enum LifecycleEvent<'a> {
    /// Fired once before the first attempt
    Starting,
    /// Fired once after the last attempt
    Ending,
    /// Fired after each failed attempt
    Failed(&'a dyn fmt::Display),
}

impl LifecycleEvent<'_> {
    /// Render the sink message for the unit of work called `name`
    pub fn message(&self, name: &str) -> String {
        match self {
            LifecycleEvent::Starting => format!("starting {}", name),
            LifecycleEvent::Ending => format!("ending {}", name),
            LifecycleEvent::Failed(detail) => {
                format!("caught failure in {}: {}", name, detail)
            }
        }
    }
}

/// Optional lifecycle callbacks plus the fallback sink
///
/// Read-only once handed to an invoker. Cloning is cheap; callbacks are shared.
pub struct HookSet<E> {
    pub(crate) before: Option<Hook>,
    pub(crate) after: Option<Hook>,
    pub(crate) on_failure: Option<FailureHook<E>>,
    pub(crate) sink: Option<Arc<dyn LifecycleSink>>,
}

impl<E> Default for HookSet<E> {
    fn default() -> Self {
        Self {
            before: None,
            after: None,
            on_failure: None,
            sink: None,
        }
    }
}

impl<E> Clone for HookSet<E> {
    fn clone(&self) -> Self {
        Self {
            before: self.before.clone(),
            after: self.after.clone(),
            on_failure: self.on_failure.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<E> fmt::Debug for HookSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl<E> HookSet<E> {
    /// Create a hook set with no hooks and no sink (all events dropped)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hook fired before the first attempt
    pub fn before(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.before = Some(Arc::new(hook));
        self
    }

    /// Set the hook fired after the last attempt
    pub fn after(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.after = Some(Arc::new(hook));
        self
    }

    /// Set the hook fired on every failed attempt
    pub fn on_failure(mut self, hook: impl Fn(&Failure<E>) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    /// Set the fallback sink
    pub fn with_sink(mut self, sink: impl LifecycleSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Set a fallback sink that is shared with the caller
    pub fn with_shared_sink(mut self, sink: Arc<dyn LifecycleSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Disable the fallback sink
    pub fn without_sink(mut self) -> Self {
        self.sink = None;
        self
    }

    /// Check whether a fallback sink is configured
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub(crate) fn fire_before(&self, name: &str) {
        self.dispatch(self.before.as_ref(), name, LifecycleEvent::Starting);
    }

    pub(crate) fn fire_after(&self, name: &str) {
        self.dispatch(self.after.as_ref(), name, LifecycleEvent::Ending);
    }

    pub(crate) fn fire_failure(&self, name: &str, failure: &Failure<E>)
    where
        E: fmt::Display,
    {
        match &self.on_failure {
            Some(hook) => hook(failure),
            None => self.emit(name, LifecycleEvent::Failed(failure)),
        }
    }

    fn dispatch(&self, hook: Option<&Hook>, name: &str, event: LifecycleEvent<'_>) {
        match hook {
            Some(hook) => hook(),
            None => self.emit(name, event),
        }
    }

    fn emit(&self, name: &str, event: LifecycleEvent<'_>) {
        if let Some(sink) = &self.sink {
            sink.emit(&event.message(name));
        }
    }
}
