use super::*;
use crate::error::LookupError;
use std::cell::Cell;

fn fast(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::ZERO)
}

#[test]
fn test_default_policy() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.backoff, Duration::from_secs(1));
}

#[test]
fn test_delay_grows_linearly() {
    let policy = RetryPolicy::new(5, Duration::from_millis(100));
    assert_eq!(policy.delay(1), Duration::from_millis(100));
    assert_eq!(policy.delay(3), Duration::from_millis(300));
}

#[test]
fn test_success_on_first_attempt_skips_hook() {
    let hooked = Cell::new(0);
    let result: Result<&str, &str> = retry(
        &fast(3),
        |_| true,
        |_, _| hooked.set(hooked.get() + 1),
        || Ok("done"),
    );

    assert_eq!(result, Ok("done"));
    assert_eq!(hooked.get(), 0);
}

#[test]
fn test_retries_until_success() {
    let calls = Cell::new(0);
    let result: Result<u32, String> = retry(
        &fast(5),
        |_| true,
        |_, _| {},
        || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(format!("attempt {} failed", calls.get()))
            } else {
                Ok(calls.get())
            }
        },
    );

    assert_eq!(result, Ok(3));
    assert_eq!(calls.get(), 3);
}

#[test]
fn test_returns_last_error_after_max_attempts() {
    let calls = Cell::new(0);
    let attempts_seen = std::cell::RefCell::new(Vec::new());
    let result: Result<(), String> = retry(
        &fast(3),
        |_| true,
        |_, attempt| attempts_seen.borrow_mut().push(attempt),
        || {
            calls.set(calls.get() + 1);
            Err(format!("failure {}", calls.get()))
        },
    );

    assert_eq!(result, Err("failure 3".to_string()));
    assert_eq!(calls.get(), 3);
    assert_eq!(*attempts_seen.borrow(), vec![1, 2]);
}

#[test]
fn test_non_retryable_error_returned_immediately() {
    let calls = Cell::new(0);
    let result: Result<(), LookupError> = retry(
        &fast(5),
        LookupError::is_retryable,
        |_, _| panic!("hook must not run"),
        || {
            calls.set(calls.get() + 1);
            Err(LookupError::not_found("quay.io/org/app:v1"))
        },
    );

    assert!(matches!(result, Err(LookupError::NotFound { .. })));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_transport_errors_are_retried() {
    let calls = Cell::new(0);
    let result: Result<(), LookupError> = retry(
        &fast(2),
        LookupError::is_retryable,
        |_, _| {},
        || {
            calls.set(calls.get() + 1);
            Err(LookupError::transport("connection reset", None))
        },
    );

    assert!(result.is_err());
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_zero_attempts_still_runs_once() {
    let calls = Cell::new(0);
    let _: Result<(), ()> = retry(
        &fast(0),
        |_| true,
        |_, _| {},
        || {
            calls.set(calls.get() + 1);
            Err(())
        },
    );
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_no_retry_policy() {
    let policy = RetryPolicy::no_retry();
    assert_eq!(policy.max_attempts, 1);
}
