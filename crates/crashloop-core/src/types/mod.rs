//! Type definitions for crashloop

mod policy;

pub use policy::{AttemptLimit, RestartConfig, RetryPolicy};
