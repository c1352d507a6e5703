//! Restart policy types
//!
//! These types describe how often a unit of work may be attempted and how long
//! to wait between attempts. They deserialize from the kebab-case YAML used by
//! `crashloop.yaml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Decoded form of the raw `max-attempts` integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptLimit {
    /// Retry forever (raw value < 0)
    Unbounded,
    /// Attempt at most this many times (raw value >= 0)
    Limited(u32),
}

impl AttemptLimit {
    /// Decode the raw integer: negative means unbounded
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            AttemptLimit::Unbounded
        } else {
            AttemptLimit::Limited(u32::try_from(raw).unwrap_or(u32::MAX))
        }
    }

    /// Check whether this limit is unbounded
    pub fn is_unbounded(&self) -> bool {
        matches!(self, AttemptLimit::Unbounded)
    }
}

/// Fixed-delay restart policy
///
/// Immutable once built: fields are private and only readable through
/// accessors. The delay keeps full `Duration` precision in memory and is
/// written to config files as whole milliseconds (`delay-ms`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Delay between a failed attempt and the next one
    #[serde(rename = "delay-ms", with = "delay_ms", default = "default_delay")]
    delay: Duration,

    /// Maximum attempts; negative means unbounded, zero means never run
    #[serde(default = "default_max_attempts")]
    max_attempts: i64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: default_delay(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_delay() -> Duration {
    Duration::from_millis(1000)
}
fn default_max_attempts() -> i64 {
    -1
}

/// `delay-ms` wire format: a `Duration` as an integer number of milliseconds
mod delay_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

impl RetryPolicy {
    /// Create a policy from a delay and a raw attempt count
    ///
    /// `max_attempts < 0` retries forever, `0` never invokes the unit of work,
    /// and a positive value caps the number of invocations.
    pub fn new(delay: Duration, max_attempts: i64) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }

    /// Create a policy that retries forever
    pub fn unbounded(delay: Duration) -> Self {
        Self::new(delay, -1)
    }

    /// Create a policy that attempts at most `max_attempts` times
    pub fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self::new(delay, i64::from(max_attempts))
    }

    /// Delay between attempts
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Raw attempt count as configured
    pub fn max_attempts(&self) -> i64 {
        self.max_attempts
    }

    /// Decoded attempt limit
    pub fn limit(&self) -> AttemptLimit {
        AttemptLimit::from_raw(self.max_attempts)
    }

    /// Copy of this policy with a different delay
    pub fn with_delay(&self, delay: Duration) -> Self {
        Self::new(delay, self.max_attempts)
    }

    /// Copy of this policy with a different attempt count
    pub fn with_max_attempts(&self, max_attempts: i64) -> Self {
        Self::new(self.delay, max_attempts)
    }
}

/// Restart configuration: a default policy plus named per-operation policies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RestartConfig {
    /// Policy used when no operation-specific policy exists
    #[serde(default)]
    pub default: RetryPolicy,

    /// Per-operation policies
    #[serde(default)]
    pub operations: HashMap<String, RetryPolicy>,
}

impl RestartConfig {
    /// Look up the policy for an operation, falling back to the default
    pub fn policy_for(&self, operation: &str) -> &RetryPolicy {
        self.operations.get(operation).unwrap_or(&self.default)
    }
}
