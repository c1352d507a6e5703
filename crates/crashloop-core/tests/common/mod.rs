//! Common test utilities for crashloop-core
//!
//! Shared fixtures for the integration tests:
//! - An ordered lifecycle event tracker
//! - Scripted units of work that fail a fixed number of times

#![allow(dead_code)]

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crashloop_core::restart::HookSet;
use crashloop_core::RetryPolicy;

/// Delay used by tests that do not measure timing
pub const FAST_DELAY: Duration = Duration::from_millis(2);

pub fn fast_policy(max_attempts: i64) -> RetryPolicy {
    RetryPolicy::new(FAST_DELAY, max_attempts)
}

/// Records lifecycle events in the order they fire
#[derive(Clone, Default)]
pub struct EventTracker {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks that record `before`, `failure: <detail>`, and `after`
    pub fn hooks<E: fmt::Display>(&self) -> HookSet<E> {
        let before = self.clone();
        let after = self.clone();
        let failure = self.clone();
        HookSet::new()
            .before(move || before.record("before"))
            .after(move || after.record("after"))
            .on_failure(move |f| failure.record(format!("failure: {}", f)))
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

/// Unit of work failing `failures` times before succeeding with the call number
#[derive(Clone)]
pub struct ScriptedUnit {
    calls: Arc<AtomicU32>,
    failures: u32,
}

impl ScriptedUnit {
    pub fn failing_times(failures: u32) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            failures,
        }
    }

    pub fn always_failing() -> Self {
        Self::failing_times(u32::MAX)
    }

    pub fn call(&self) -> Result<u32, String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(format!("scripted failure #{}", call))
        } else {
            Ok(call)
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}
