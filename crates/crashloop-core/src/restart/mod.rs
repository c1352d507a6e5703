//! Restart-on-failure invokers
//!
//! This module wraps a unit of work so that it is re-run whenever it fails,
//! with a fixed delay between attempts and lifecycle hooks around the whole
//! run. It is meant for long-lived worker loops that must survive transient
//! failures without an external supervisor.
//!
//! # Features
//!
//! - `SyncInvoker`: blocking loop for dedicated threads
//! - `CooperativeInvoker`: async loop that never blocks the tokio scheduler
//! - Before / after / on-failure hooks with a pluggable fallback sink
//! - Bounded, unbounded, and zero-attempt policies
//! - Early termination through a `CancellationToken`
//! - Panics in the unit of work are caught and treated as failures
//!
//! # Example
//!
//! ```rust,no_run
//! use crashloop_core::restart::{InvokerBuilder, TracingSink};
//! use crashloop_core::types::RetryPolicy;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example(shutdown: CancellationToken) {
//!     let invoker = InvokerBuilder::new("queue-consumer")
//!         .with_policy(RetryPolicy::unbounded(Duration::from_secs(5)))
//!         .with_sink(TracingSink::new())
//!         .wrap_cooperative(|| async {
//!             // Your long-running worker here
//!             Ok::<_, std::io::Error>(())
//!         });
//!
//!     let outcome = invoker.invoke_with_cancel(&shutdown).await;
//!     assert!(outcome.is_success() || outcome.is_cancelled());
//! }
//! ```

mod attempts;
mod blocking;
mod builder;
mod cooperative;
mod failure;
mod hooks;
mod invoker;

pub use blocking::SyncInvoker;
pub use builder::InvokerBuilder;
pub use cooperative::CooperativeInvoker;
pub use failure::{Failure, Outcome};
pub use hooks::{
    FailureHook, Hook, HookSet, LifecycleEvent, LifecycleSink, RecordingSink, TracingSink,
};
pub use invoker::ResilientInvoker;
