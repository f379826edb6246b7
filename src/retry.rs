//! Retry executor with exponential backoff and jitter.
//!
//! External calls (entropy source, vision classifier) go through
//! [`RetryConfig::execute`], which re-runs a fallible async operation with
//! exponentially growing waits between attempts. Only failures the config
//! classifies as retryable trigger another attempt; everything else
//! propagates immediately. Waits use [`tokio::time::sleep`], so a retrying
//! task never stalls its neighbours.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Fraction of the current delay used as the jitter band (±10%).
const JITTER_FRACTION: f64 = 0.1;

/// Predicate deciding whether a failure is worth another attempt.
pub type RetryPredicate = fn(&Error) -> bool;

fn retry_any(_: &Error) -> bool {
    true
}

fn retry_transient(err: &Error) -> bool {
    err.is_transient()
}

/// Retry policy for a sequence of attempts at one operation.
///
/// Constructors clamp their arguments into valid ranges: at least one
/// attempt, a positive initial delay, a maximum delay no smaller than the
/// initial one, and a backoff factor of at least 1.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Wait before the second attempt.
    pub initial_delay: Duration,
    /// Cap on the wait between attempts.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_factor: f64,
    /// Randomize each wait by ±10% to avoid synchronized retry storms.
    pub jitter: bool,
    /// Classifies which failures are retryable.
    pub retryable: RetryPredicate,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl RetryConfig {
    /// Create a policy with the given attempt count, delays, and factor.
    ///
    /// Jitter is enabled and every failure is considered retryable; use
    /// [`Self::retry_if`] to narrow the predicate.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_factor: f64,
    ) -> Self {
        let initial_delay = initial_delay.max(Duration::from_millis(1));
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: max_delay.max(initial_delay),
            backoff_factor: backoff_factor.max(1.0),
            jitter: true,
            retryable: retry_any,
        }
    }

    /// Quick retries for fast operations.
    #[must_use]
    pub fn quick() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(5), 2.0)
    }

    /// Standard retries for most operations.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(30), 2.0)
    }

    /// Patient retries for expensive operations.
    #[must_use]
    pub fn patient() -> Self {
        Self::new(5, Duration::from_secs(2), Duration::from_secs(60), 2.0)
    }

    /// Network-oriented retries for external APIs.
    ///
    /// Four attempts, 2s initial delay doubling up to a 16s cap, and only
    /// transient failures (timeouts, malformed responses) are retried.
    #[must_use]
    pub fn network() -> Self {
        Self::new(4, Duration::from_secs(2), Duration::from_secs(16), 2.0)
            .retry_if(retry_transient)
    }

    /// Replace the retryable-failure predicate.
    #[must_use]
    pub fn retry_if(mut self, predicate: RetryPredicate) -> Self {
        self.retryable = predicate;
        self
    }

    /// Disable or enable jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Execute `operation` under this policy.
    ///
    /// The operation is invoked up to `max_attempts` times. A success is
    /// returned immediately. A failure the predicate rejects propagates
    /// unchanged. When every attempt fails a retryable way, the last
    /// failure is returned wrapped in [`Error::RetryExhausted`] with the
    /// attempt count.
    ///
    /// Each call starts fresh at `initial_delay`; delay growth is never
    /// carried over between calls.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error (non-retryable failure) or
    /// [`Error::RetryExhausted`] (all attempts used up).
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1u32;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("succeeded on attempt {attempt}/{}", self.max_attempts);
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if !(self.retryable)(&err) {
                        debug!("permanent failure, not retrying: {err}");
                        return Err(err);
                    }
                    if attempt >= self.max_attempts {
                        warn!("all {} attempts failed: {err}", self.max_attempts);
                        return Err(Error::RetryExhausted {
                            attempts: self.max_attempts,
                            source: Box::new(err),
                        });
                    }

                    let wait = self.jittered(delay);
                    warn!(
                        "attempt {attempt}/{} failed: {err}; retrying in {:.2}s",
                        self.max_attempts,
                        wait.as_secs_f64()
                    );
                    sleep(wait).await;

                    delay = delay.mul_f64(self.backoff_factor).min(self.max_delay);
                    attempt += 1;
                }
            }
        }
    }

    /// Apply jitter to a computed delay, flooring at zero.
    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }

        use rand::Rng;
        let base = delay.as_secs_f64();
        let offset = rand::thread_rng().gen_range(-JITTER_FRACTION..=JITTER_FRACTION) * base;
        Duration::from_secs_f64((base + offset).max(0.0))
    }
}

/// Reusable wrapper that applies a fixed [`RetryConfig`] to operations.
///
/// This is the decorator form of the executor: construct it once with a
/// policy, then [`run`](Self::run) any zero-argument async operation
/// through it without changing the operation's success-path return value.
#[derive(Debug, Clone, Copy)]
pub struct Retrier {
    config: RetryConfig,
}

impl Retrier {
    /// Create a retrier with the given policy.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The wrapped policy.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` under the fixed policy.
    ///
    /// # Errors
    ///
    /// Propagates failures exactly as [`RetryConfig::execute`] does.
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.config.execute(operation).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_millis(10),
            2.0,
        )
        .with_jitter(false)
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = fast_config(3)
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = fast_config(3)
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    let attempt = calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(Error::Network("flaky".into()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_annotates_attempt_count() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<()> = fast_config(3)
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::Network("persistent failure".into()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let err = result.unwrap_err();
        assert!(matches!(err, Error::RetryExhausted { attempts: 3, .. }));
        assert!(err.to_string().contains("persistent failure"));
    }

    #[tokio::test]
    async fn test_non_retryable_propagates_immediately() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<()> = fast_config(5)
            .retry_if(|err| err.is_transient())
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::NotFound("gone".into()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), Error::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_never_sleeps() {
        let start = tokio::time::Instant::now();

        let result: Result<()> = fast_config(1)
            .execute(|| async { Err(Error::Network("down".into())) })
            .await;

        assert!(matches!(
            result.unwrap_err(),
            Error::RetryExhausted { attempts: 1, .. }
        ));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    /// With a paused clock, the elapsed time before the k-th attempt is the
    /// exact backoff sum: 1s + 2s + 4s for four attempts, capped at 5s.
    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_exponentially_and_caps() {
        let config = RetryConfig::new(
            5,
            Duration::from_secs(1),
            Duration::from_secs(5),
            2.0,
        )
        .with_jitter(false);

        let start = tokio::time::Instant::now();
        let result: Result<()> = config
            .execute(|| async { Err(Error::Network("down".into())) })
            .await;

        assert!(result.is_err());
        // Waits: 1 + 2 + 4 + 5 (capped) = 12s across five attempts.
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_jitter_stays_within_band() {
        let config = RetryConfig::standard();
        let delay = Duration::from_secs(10);

        for _ in 0..100 {
            let jittered = config.jittered(delay);
            assert!(jittered >= Duration::from_secs_f64(9.0));
            assert!(jittered <= Duration::from_secs_f64(11.0));
        }
    }

    #[test]
    fn test_constructors_clamp_invalid_values() {
        let config = RetryConfig::new(0, Duration::ZERO, Duration::ZERO, 0.5);
        assert_eq!(config.max_attempts, 1);
        assert!(config.initial_delay > Duration::ZERO);
        assert!(config.max_delay >= config.initial_delay);
        assert!(config.backoff_factor >= 1.0);
    }

    #[test]
    fn test_presets() {
        let quick = RetryConfig::quick();
        assert_eq!(quick.max_attempts, 3);
        assert_eq!(quick.initial_delay, Duration::from_millis(500));
        assert_eq!(quick.max_delay, Duration::from_secs(5));

        let network = RetryConfig::network();
        assert_eq!(network.max_attempts, 4);
        assert_eq!(network.initial_delay, Duration::from_secs(2));
        assert_eq!(network.max_delay, Duration::from_secs(16));
        assert!((network.retryable)(&Error::Network("timeout".into())));
        assert!(!(network.retryable)(&Error::NotFound("missing".into())));

        let patient = RetryConfig::patient();
        assert_eq!(patient.max_attempts, 5);
        assert_eq!(patient.max_delay, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_retrier_preserves_return_value() {
        let retrier = Retrier::new(fast_config(2));

        let value: u64 = retrier.run(|| async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(retrier.config().max_attempts, 2);
    }
}
