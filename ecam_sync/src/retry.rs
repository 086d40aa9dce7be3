//! Bounded retry combinator.
//!
//! The attempt budget is sized from the link timeout so that a full retry
//! sequence fits inside a fixed external deadline:
//! `N = max(1, floor(3 / (timeout + 0.1)))`.
//! Attempts run back to back on the calling thread and cannot be cancelled.

use ecam_common::consts::{RETRY_DEADLINE_S, RETRY_OVERHEAD_S};
use ecam_common::link::driver::LinkError;
use tracing::warn;

/// Every attempt failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryExhausted {
    /// Attempts made.
    pub attempts: u32,
    /// Error of the final attempt.
    pub last: LinkError,
}

/// Fixed attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
}

impl RetryPolicy {
    /// Budget for a per-call link timeout in seconds.
    pub fn from_timeout(timeout_s: f64) -> Self {
        let n = (RETRY_DEADLINE_S / (timeout_s + RETRY_OVERHEAD_S)).floor();
        let attempts = if n.is_finite() && n >= 1.0 {
            n.min(f64::from(u32::MAX)) as u32
        } else {
            1
        };
        Self { attempts }
    }

    /// Explicit budget, at least one attempt.
    pub const fn with_attempts(attempts: u32) -> Self {
        Self {
            attempts: if attempts == 0 { 1 } else { attempts },
        }
    }

    /// Maximum number of attempts.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run `op` until it succeeds or the budget is spent.
    ///
    /// Each failure is logged. Non-transient errors end the sequence early.
    /// The last error is kept for the caller's report.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut(u32) -> Result<T, LinkError>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    warn!("{} error retry {}/{}: {}", what, attempt, self.attempts, e);
                    if attempt >= self.attempts || !e.is_transient() {
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last: e,
                        });
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_timeout(ecam_common::consts::DEFAULT_TIMEOUT_S)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_from_timeout() {
        assert_eq!(RetryPolicy::from_timeout(0.5).attempts(), 5);
        assert_eq!(RetryPolicy::from_timeout(1.0).attempts(), 2);
        assert_eq!(RetryPolicy::from_timeout(2.9).attempts(), 1);
        assert_eq!(RetryPolicy::from_timeout(5.0).attempts(), 1);
        assert_eq!(RetryPolicy::from_timeout(f64::INFINITY).attempts(), 1);
        assert_eq!(RetryPolicy::with_attempts(0).attempts(), 1);
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::with_attempts(4);
        let mut calls = 0;
        let result = policy.run("probe", |attempt| {
            calls += 1;
            if attempt < 2 {
                Err(LinkError::Timeout(format!("attempt {attempt}")))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result, Ok(2));
        assert_eq!(calls, 3);
    }

    #[test]
    fn keeps_last_error() {
        let policy = RetryPolicy::with_attempts(3);
        let result: Result<(), _> =
            policy.run("probe", |attempt| Err(LinkError::Timeout(format!("attempt {attempt}"))));
        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last, LinkError::Timeout("attempt 2".into()));
    }

    #[test]
    fn non_transient_stops_early() {
        let policy = RetryPolicy::with_attempts(5);
        let mut calls = 0;
        let result: Result<(), _> = policy.run("probe", |_| {
            calls += 1;
            Err(LinkError::NotConnected)
        });
        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls, 1);
    }
}
