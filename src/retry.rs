//! Bounded retry with exponential backoff
//!
//! Navigation and media downloads both retry through a [`RetryPolicy`]. A
//! policy carries one total attempt budget (the first try included) and the
//! delay schedule between attempts; there are no nested retry layers.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Future of one attempt that borrows the state passed to
/// [`RetryPolicy::run_with`]
pub type AttemptFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Upper bound for a single backoff delay
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Attempt budget and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt)
    max_attempts: u32,

    /// Delay before the first retry; doubled for each later one
    base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after `attempt` (1-indexed) failed
    ///
    /// `base * 2^(attempt - 1)`, capped at 30 seconds.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(MAX_DELAY)
    }

    /// Decides what follows a failed attempt
    ///
    /// Returns the delay before the next attempt, or None when the budget is
    /// spent or the error is not worth retrying.
    fn backoff(&self, attempt: u32, retryable: bool) -> Option<Duration> {
        if attempt >= self.max_attempts || !retryable {
            return None;
        }
        let delay = self.delay_after(attempt);
        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "will retry");
        Some(delay)
    }

    /// Runs `op` until it succeeds, the budget runs out, or `is_retryable`
    /// rejects the error
    ///
    /// `op` receives the 1-indexed attempt number. On failure the last error
    /// is returned together with the number of attempts made.
    pub async fn run<T, E, F, Fut, R>(&self, mut op: F, is_retryable: R) -> Result<T, (E, u32)>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => match self.backoff(attempt, is_retryable(&err)) {
                    Some(delay) => {
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err((err, attempt)),
                },
            }
        }
    }

    /// Like [`run`](Self::run), but each attempt borrows `state` mutably
    ///
    /// Used when the operation drives an exclusively owned handle, such as a
    /// page driver, that the attempt future has to hold across its awaits.
    pub async fn run_with<S, T, E, F, R>(
        &self,
        state: &mut S,
        mut op: F,
        is_retryable: R,
    ) -> Result<T, (E, u32)>
    where
        S: ?Sized,
        F: for<'a> FnMut(&'a mut S, u32) -> AttemptFuture<'a, T, E>,
        R: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op(&mut *state, attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => match self.backoff(attempt, is_retryable(&err)) {
                    Some(delay) => {
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err((err, attempt)),
                },
            }
        }
    }
}
