//! Per-invocation attempt counting
//!
//! Both invokers share one counting rule: an attempt is counted immediately
//! before the unit of work runs, and a `Limited(n)` policy grants exactly `n`
//! attempts. `Limited(0)` grants none.

use crate::types::AttemptLimit;

/// Attempts consumed by a single `invoke` call
///
/// Created fresh at the start of every invocation and dropped when its loop
/// ends, so separate calls never share counts.
#[derive(Debug)]
pub(crate) struct AttemptCounter {
    used: u32,
    limit: AttemptLimit,
}

impl AttemptCounter {
    pub(crate) fn new(limit: AttemptLimit) -> Self {
        Self { used: 0, limit }
    }

    /// Whether another attempt may start
    pub(crate) fn has_remaining(&self) -> bool {
        match self.limit {
            AttemptLimit::Unbounded => true,
            AttemptLimit::Limited(max) => self.used < max,
        }
    }

    /// Count one attempt and return its 1-indexed number
    ///
    /// Unbounded counters saturate at `u32::MAX` rather than wrapping.
    pub(crate) fn begin(&mut self) -> u32 {
        self.used = self.used.saturating_add(1);
        self.used
    }

    /// Attempts counted so far
    pub(crate) fn used(&self) -> u32 {
        self.used
    }

    /// Configured ceiling, or `None` when unbounded
    pub(crate) fn ceiling(&self) -> Option<u32> {
        match self.limit {
            AttemptLimit::Unbounded => None,
            AttemptLimit::Limited(max) => Some(max),
        }
    }
}
