//! Failure and outcome types for restart invocations

use std::any::Any;
use std::fmt;

/// What a failed attempt produced
///
/// A unit of work fails either by returning `Err` or by panicking. Both are
/// intercepted at the invoker boundary and never reach the caller.
#[derive(Debug)]
pub enum Failure<E> {
    /// The unit of work returned an error
    Error(E),

    /// The unit of work panicked; carries the panic message when one was given
    Panicked(String),
}

impl<E> Failure<E> {
    /// Build a failure from a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Failure::Panicked(message)
    }

    /// Check if this failure came from a panic
    pub fn is_panic(&self) -> bool {
        matches!(self, Failure::Panicked(_))
    }

    /// Get a reference to the returned error, if any
    pub fn error(&self) -> Option<&E> {
        match self {
            Failure::Error(err) => Some(err),
            Failure::Panicked(_) => None,
        }
    }

    /// Get the returned error, consuming this failure
    pub fn into_error(self) -> Option<E> {
        match self {
            Failure::Error(err) => Some(err),
            Failure::Panicked(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Error(err) => write!(f, "{}", err),
            Failure::Panicked(message) => write!(f, "panicked: {}", message),
        }
    }
}

/// Result of one call to an invoker
///
/// `Exhausted` and `Cancelled` are the "no result" sentinels: neither carries
/// a value, and neither is an error.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// An attempt completed without failing
    Succeeded {
        /// Value returned by the successful attempt
        value: T,
        /// Attempt number that succeeded (1-indexed)
        attempts: u32,
    },

    /// A bounded policy ran out of attempts
    Exhausted {
        /// Number of attempts made
        attempts: u32,
    },

    /// The cancellation token fired before an attempt succeeded
    Cancelled {
        /// Number of attempts made before cancellation
        attempts: u32,
    },
}

impl<T> Outcome<T> {
    /// Number of attempts consumed by the invocation
    pub fn attempts(&self) -> u32 {
        match self {
            Outcome::Succeeded { attempts, .. }
            | Outcome::Exhausted { attempts }
            | Outcome::Cancelled { attempts } => *attempts,
        }
    }

    /// Check if the invocation produced a value
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }

    /// Check if the invocation ran out of attempts
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Outcome::Exhausted { .. })
    }

    /// Check if the invocation was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled { .. })
    }

    /// Get a reference to the value, if any
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Succeeded { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Collapse into the value, with `None` as the "no result" sentinel
    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Succeeded { value, .. } => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::panic;

    #[test]
    fn test_failure_display() {
        let err: Failure<io::Error> = Failure::Error(io::Error::other("disk full"));
        assert_eq!(err.to_string(), "disk full");

        let panicked: Failure<io::Error> = Failure::Panicked("index out of bounds".to_string());
        assert_eq!(panicked.to_string(), "panicked: index out of bounds");
        assert!(panicked.is_panic());
        assert!(panicked.error().is_none());
    }

    #[test]
    fn test_failure_from_panic_payloads() {
        let payload = panic::catch_unwind(|| panic!("static message")).unwrap_err();
        let failure: Failure<String> = Failure::from_panic(payload);
        assert_eq!(failure.to_string(), "panicked: static message");

        let code = 7;
        let payload = panic::catch_unwind(|| panic!("formatted {}", code)).unwrap_err();
        let failure: Failure<String> = Failure::from_panic(payload);
        assert_eq!(failure.to_string(), "panicked: formatted 7");

        let payload = panic::catch_unwind(|| panic::panic_any(42_u8)).unwrap_err();
        let failure: Failure<String> = Failure::from_panic(payload);
        assert!(failure.to_string().contains("non-string"));
    }

    #[test]
    fn test_into_error() {
        let failure: Failure<String> = Failure::Error("boom".to_string());
        assert_eq!(failure.into_error(), Some("boom".to_string()));
    }

    #[test]
    fn test_outcome_accessors() {
        let ok: Outcome<u8> = Outcome::Succeeded {
            value: 3,
            attempts: 2,
        };
        assert!(ok.is_success());
        assert_eq!(ok.value(), Some(&3));
        assert_eq!(ok.attempts(), 2);
        assert_eq!(ok.into_value(), Some(3));

        let exhausted: Outcome<u8> = Outcome::Exhausted { attempts: 4 };
        assert!(exhausted.is_exhausted());
        assert_eq!(exhausted.attempts(), 4);
        assert_eq!(exhausted.into_value(), None);

        let cancelled: Outcome<u8> = Outcome::Cancelled { attempts: 0 };
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.into_value(), None);
    }
}
