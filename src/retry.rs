//! Bounded retry with a fixed delay
//!
//! Wraps a whole request: the operation runs up to `max_attempts` times with
//! `delay` between attempts. The final attempt's error is returned unchanged.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is raised to 1
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation` until it succeeds or attempts run out
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.run_if(operation, |_| true).await
    }

    /// Like [`RetryPolicy::run`], but errors rejected by `retryable` are
    /// returned at once
    pub async fn run_if<T, E, F, Fut, R>(&self, mut operation: F, retryable: R) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        R: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts || !retryable(&e) => return Err(e),
                Err(e) => {
                    log::warn!(
                        "⏳ Attempt {} of {} failed: {}. Retrying in {}ms",
                        attempt,
                        self.max_attempts,
                        e,
                        self.delay.as_millis()
                    );
                    sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Convenience wrapper around [`RetryPolicy::run`]
pub async fn with_retry<T, E, F, Fut>(
    operation: F,
    max_attempts: u32,
    delay: Duration,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    RetryPolicy::new(max_attempts, delay).run(operation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_two_failures() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<&str, String> = with_retry(
            move |_| async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("failure {}", n))
                } else {
                    Ok("done")
                }
            },
            3,
            Duration::ZERO,
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_always_failing_returns_last_error() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = with_retry(
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure {}", attempt)) }
            },
            3,
            Duration::ZERO,
        )
        .await;

        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_first_success_runs_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::from_secs(60));

        let result: Result<u32, String> = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(attempt) }
            })
            .await;

        assert_eq!(result, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fixed_delay_between_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(20));
        let started = std::time::Instant::now();

        let _: Result<(), &str> = policy.run(|_| async { Err("boom") }).await;

        // two pauses
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let result: Result<(), String> = policy
            .run_if(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("fatal".to_string()) }
                },
                |e: &String| e != "fatal",
            )
            .await;

        assert_eq!(result, Err("fatal".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }
}
