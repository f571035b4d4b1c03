//! Retry policy for transient transfer failures.
//!
//! The policy only decides *how often* and *how long to wait*; which errors
//! are worth another attempt is supplied by the caller as a predicate, so the
//! same loop serves manifest fetches and archive downloads.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Parameters of a bounded retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Spread each delay by a random factor in `[0.5, 1.5)`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Set the maximum number of attempts (at least one).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after the given failed attempt (0-indexed).
    ///
    /// Doubles per attempt and is capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2f64.powi(attempt.min(16) as i32);
        let secs = (self.base_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());

        let secs = if self.jitter {
            let spread = rand::rng().random_range(0.5..1.5);
            (secs * spread).min(self.max_delay.as_secs_f64())
        } else {
            secs
        };

        Duration::from_secs_f64(secs)
    }
}

/// Outcome bookkeeping for one retry loop.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    /// Number of attempts made.
    pub attempts: u32,
    /// Total time spent waiting between attempts.
    pub total_delay: Duration,
    /// Last error message if an attempt failed.
    pub last_error: Option<String>,
}

/// Run `operation` until it succeeds, fails with an error `should_retry`
/// rejects, or the policy runs out of attempts.
pub async fn retry_async<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
) -> (Result<T, E>, RetryStats)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut stats = RetryStats::default();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        stats.attempts = attempt + 1;

        let err = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("Succeeded on attempt {}/{}", attempt + 1, max_attempts);
                }
                return (Ok(value), stats);
            }
            Err(err) => err,
        };

        stats.last_error = Some(err.to_string());

        if !should_retry(&err) {
            debug!("Not retrying: {}", err);
            return (Err(err), stats);
        }
        if attempt + 1 >= max_attempts {
            warn!("Giving up after {} attempts: {}", max_attempts, err);
            return (Err(err), stats);
        }

        let delay = policy.delay_after(attempt);
        stats.total_delay += delay;
        warn!(
            "Attempt {}/{} failed: {}. Retrying in {:?}",
            attempt + 1,
            max_attempts,
            err,
            delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
