//! Retrying fallible operations.
//!
//! Registry lookups fail transiently often enough that callers want a few
//! attempts with a pause in between. The client itself never retries; this
//! is where that decision lives.

use std::time::Duration;
use tracing::debug;

#[cfg(test)]
mod tests;

/// How many times to try, and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Attempt `n` is followed by a pause of `n * backoff`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// A single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

/// Calls `op` until it succeeds or the policy runs out of attempts.
///
/// An error for which `should_retry` returns false is returned at once.
/// Before each further attempt `hook` sees the error and the number of the
/// attempt that failed. The last error is returned when all attempts fail.
///
/// # Examples
///
/// ```
/// use libsretool::retry::{RetryPolicy, retry};
/// use std::time::Duration;
///
/// let mut calls = 0;
/// let result: Result<u32, &str> = retry(
///     &RetryPolicy::new(3, Duration::ZERO),
///     |_| true,
///     |_, _| {},
///     || {
///         calls += 1;
///         if calls < 2 { Err("busy") } else { Ok(calls) }
///     },
/// );
/// assert_eq!(result, Ok(2));
/// ```
pub fn retry<T, E, P, H, F>(
    policy: &RetryPolicy,
    should_retry: P,
    mut hook: H,
    mut op: F,
) -> Result<T, E>
where
    P: Fn(&E) -> bool,
    H: FnMut(&E, u32),
    F: FnMut() -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts || !should_retry(&e) => return Err(e),
            Err(e) => {
                hook(&e, attempt);
                let delay = policy.delay(attempt);
                debug!(attempt, ?delay, "retrying after failure");
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}
