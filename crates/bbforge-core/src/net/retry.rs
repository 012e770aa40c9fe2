use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::CancellationToken;
use crate::error::FetchError;

/// Upper bound for a single backoff delay.
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Waits between retry attempts. Injected so tests never sleep.
pub trait Sleeper: Send + Sync + fmt::Debug {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Bounded retry with exponential backoff for transient failures.
///
/// Only errors for which [`FetchError::is_transient`] holds are retried;
/// 404 and other client errors return immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first attempt; values below 1 are raised to 1.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the given failed attempt (1-based): `base * 2^(attempt-1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(MAX_DELAY)
    }

    /// Run `op` until it succeeds, fails permanently or runs out of attempts.
    ///
    /// Cancellation is checked before every attempt.
    pub fn run<T>(
        &self,
        cancel: &CancellationToken,
        target: &str,
        mut op: impl FnMut() -> Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        let mut attempt = 0;
        loop {
            cancel.check()?;
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        target_url = target,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Request failed, retrying"
                    );
                    self.sleeper.sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
