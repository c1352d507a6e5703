//! # crashloop-core
//!
//! Core library for crashloop providing:
//! - Restart-on-failure invokers for blocking and cooperative (tokio) work
//! - Lifecycle hooks with a pluggable fallback sink
//! - Retry policy types and hierarchical configuration loading

pub mod config;
pub mod error;
pub mod restart;
pub mod types;

pub use config::ConfigLoader;
pub use error::{Error, Result};
pub use restart::{
    CooperativeInvoker, Failure, HookSet, InvokerBuilder, Outcome, ResilientInvoker, SyncInvoker,
};
pub use types::{AttemptLimit, RestartConfig, RetryPolicy};
