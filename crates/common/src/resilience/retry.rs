//! Retry loop with backoff, jitter, budgets and cancellation
//!
//! [`RetryExecutor`] keeps calling an async operation until it succeeds or
//! one of these stops it: the policy says [`RetryDecision::Stop`], the
//! attempt budget is spent, the total-time budget is spent, or the caller's
//! token is cancelled. Whatever stops it, the most recent error travels back
//! inside the [`RetryError`].

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Why the loop gave up
#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts")]
    AttemptsExhausted { attempts: u32, last: E },

    /// The policy classified the error as permanent
    #[error("permanent failure on attempt {attempts}")]
    NonRetryable { attempts: u32, error: E },

    #[error("invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The total-time budget ran out before the next attempt could start
    #[error("retry budget of {elapsed:?} spent")]
    TimeoutExceeded { elapsed: Duration, last: Option<E> },

    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Classifies a failed attempt
///
/// `attempt` is 0-based. Closures of the shape `Fn(&E, u32) -> RetryDecision`
/// are policies too.
pub trait RetryPolicy<E> {
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

impl<E, F> RetryPolicy<E> for F
where
    F: Fn(&E, u32) -> RetryDecision,
{
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
        self(error, attempt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait for the configured backoff, then try again
    Retry,
    /// Try again after exactly this long (a server-provided `Retry-After`)
    RetryAfter(Duration),
    Stop,
}

/// Delay before the next attempt
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    Fixed(Duration),
    /// `initial_delay * base^attempt`, never above `max_delay`
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial_delay, base, max_delay } => {
                let factor = base.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
                let scaled = initial_delay.as_secs_f64() * factor;
                if !scaled.is_finite() || scaled >= max_delay.as_secs_f64() {
                    *max_delay
                } else {
                    Duration::from_secs_f64(scaled)
                }
            }
        }
    }
}

/// Randomisation applied on top of the backoff delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    None,
    /// Anywhere in `0..=delay`
    Full,
    /// Anywhere in `delay/2..=delay`
    Equal,
}

impl Jitter {
    pub fn apply(self, delay: Duration) -> Duration {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        match self {
            Self::None => delay,
            Self::Full => Duration::from_millis(random_up_to(millis)),
            Self::Equal => {
                let floor = millis / 2;
                Duration::from_millis(floor + random_up_to(millis - floor))
            }
        }
    }
}

fn random_up_to(max: u64) -> u64 {
    if max == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=max)
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts in total, the first one included
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    pub jitter: Jitter,
    /// No new attempt starts once this much time has passed
    pub max_total_time: Option<Duration>,
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if let BackoffStrategy::Exponential { base, .. } = self.backoff {
            if !(base.is_finite() && base > 0.0) {
                return Err(format!("exponential base must be positive, got {base}"));
            }
        }
        Ok(())
    }
}

/// Runs operations under one [`RetryConfig`] and [`RetryPolicy`]
///
/// Holds no per-operation state, so a shared executor can drive concurrent
/// operations.
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_cancel(&CancellationToken::new(), operation).await
    }

    /// Like [`execute`](Self::execute), returning `Cancelled` as soon as
    /// `cancel` fires, even in the middle of a backoff sleep
    #[instrument(skip_all, fields(max_attempts = self.config.max_attempts))]
    pub async fn execute_with_cancel<F, Fut, T, E>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.config.validate().map_err(|message| RetryError::InvalidConfiguration { message })?;

        let started = Instant::now();
        let mut attempts: u32 = 0;
        let mut previous: Option<E> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts });
            }
            if let Some(budget) = self.config.max_total_time {
                let elapsed = started.elapsed();
                if attempts > 0 && elapsed >= budget {
                    warn!(?elapsed, attempts, "retry time budget spent");
                    return Err(RetryError::TimeoutExceeded { elapsed, last: previous });
                }
            }

            attempts += 1;
            let error = match operation().await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(attempts, "succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let delay = match self.policy.should_retry(&error, attempts - 1) {
                RetryDecision::Stop => {
                    debug!(?error, "not retryable");
                    return Err(RetryError::NonRetryable { attempts, error });
                }
                RetryDecision::Retry => {
                    self.config.jitter.apply(self.config.backoff.delay_after(attempts - 1))
                }
                RetryDecision::RetryAfter(delay) => delay,
            };

            if attempts >= self.config.max_attempts {
                warn!(attempts, ?error, "no attempts left");
                return Err(RetryError::AttemptsExhausted { attempts, last: error });
            }

            warn!(attempt = attempts, ?delay, ?error, "attempt failed, backing off");
            previous = Some(error);

            tokio::select! {
                _ = cancel.cancelled() => return Err(RetryError::Cancelled { attempts }),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
