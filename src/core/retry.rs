//! Purpose: Bounded retry combinator with a fixed inter-attempt delay.
//! Exports: `RetryPolicy`, `Failure`, `RetryError`, `retry_with`.
//! Role: Keeps the attempt bound and delay a testable parameter of the transport.
//! Invariants: `op` runs at most `policy.attempts()` times; at least once.
//! Invariants: The delay is applied between attempts, never after the last one.
//! Invariants: A permanent failure stops the loop immediately.
use std::time::Duration;

pub const DEFAULT_ATTEMPTS: u32 = 5;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `attempts` counts the first try; zero is treated as one.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Total time spent sleeping when every attempt fails.
    pub fn total_delay(&self) -> Duration {
        self.delay * (self.attempts - 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_DELAY)
    }
}

/// Outcome of a single failed attempt.
#[derive(Debug)]
pub enum Failure<E> {
    /// Worth another attempt.
    Transient(E),
    /// Returned to the caller as-is.
    Permanent(E),
}

#[derive(Debug)]
pub enum RetryError<E> {
    Exhausted { attempts: u32, last: E },
    Permanent(E),
}

/// Runs `op` until it succeeds, fails permanently, or exhausts `policy`,
/// calling `sleep` between attempts. `op` receives the 1-based attempt number.
pub fn retry_with<T, E, F, S>(
    policy: &RetryPolicy,
    mut sleep: S,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Result<T, Failure<E>>,
    S: FnMut(Duration),
{
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(Failure::Permanent(err)) => return Err(RetryError::Permanent(err)),
            Err(Failure::Transient(err)) => {
                if attempt >= policy.attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                sleep(policy.delay);
                attempt += 1;
            }
        }
    }
}
