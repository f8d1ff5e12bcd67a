//! Token bucket rate limiting
//!
//! Allows bursts up to a maximum capacity and refills tokens at a fixed rate.
//! Clones share the same bucket, so one limiter can gate any number of
//! concurrent requests.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Clock, SystemClock};

/// Configuration for token bucket rate limiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBucketConfig {
    /// Maximum number of tokens the bucket can hold
    pub capacity: u64,
    /// Number of tokens to refill per interval
    pub refill_amount: u64,
    /// Time interval for token refill
    pub refill_interval: Duration,
}

impl TokenBucketConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".to_string());
        }
        if self.refill_amount == 0 {
            return Err("refill_amount must be greater than 0".to_string());
        }
        if self.refill_interval.is_zero() {
            return Err("refill_interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: u64,
    last_refill: Instant,
}

/// Token bucket rate limiter
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use curlkit_common::resilience::TokenBucket;
///
/// # fn example() -> Result<(), String> {
/// let limiter = TokenBucket::new(10, 5, Duration::from_secs(1))?;
/// assert!(limiter.try_acquire(3));
/// # Ok(())
/// # }
/// ```
pub struct TokenBucket<C: Clock = SystemClock> {
    config: TokenBucketConfig,
    state: Arc<Mutex<BucketState>>,
    clock: Arc<C>,
}

impl<C: Clock> TokenBucket<C> {
    /// Create a new token bucket with custom clock
    pub fn with_clock(
        capacity: u64,
        refill_amount: u64,
        refill_interval: Duration,
        clock: C,
    ) -> Result<Self, String> {
        let config = TokenBucketConfig { capacity, refill_amount, refill_interval };
        config.validate()?;

        Ok(Self {
            state: Arc::new(Mutex::new(BucketState {
                tokens: capacity,
                last_refill: clock.now(),
            })),
            clock: Arc::new(clock),
            config,
        })
    }

    /// The bucket's configuration
    pub fn config(&self) -> &TokenBucketConfig {
        &self.config
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut BucketState) -> R) -> R {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("token bucket state lock poisoned");
                poisoned.into_inner()
            }
        };
        self.refill(&mut guard);
        f(&mut guard)
    }

    /// Refill tokens for every whole interval elapsed since the last refill
    fn refill(&self, state: &mut BucketState) {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(state.last_refill);
        let interval = self.config.refill_interval.as_nanos();
        let refills = elapsed.as_nanos() / interval;

        if refills > 0 {
            let refills = u64::try_from(refills).unwrap_or(u64::MAX);
            let added = refills.saturating_mul(self.config.refill_amount);
            state.tokens = state.tokens.saturating_add(added).min(self.config.capacity);
            let consumed = self.config.refill_interval.saturating_mul(
                u32::try_from(refills).unwrap_or(u32::MAX),
            );
            state.last_refill += consumed;
            debug!(added, available = state.tokens, "refilled rate limit tokens");
        }
    }

    /// Try to acquire the specified number of tokens
    ///
    /// Returns `true` if tokens were acquired, `false` if not enough tokens
    /// are available.
    pub fn try_acquire(&self, tokens: u64) -> bool {
        self.with_state(|state| {
            if state.tokens < tokens {
                debug!(available = state.tokens, requested = tokens, "not enough tokens");
                return false;
            }
            state.tokens -= tokens;
            true
        })
    }

    /// Time until the next refill tick, or zero if tokens are available now
    pub fn time_until_available(&self, tokens: u64) -> Duration {
        self.with_state(|state| {
            if state.tokens >= tokens {
                return Duration::ZERO;
            }
            let since = self.clock.now().saturating_duration_since(state.last_refill);
            self.config.refill_interval.saturating_sub(since)
        })
    }

    /// Wait until `tokens` can be acquired
    ///
    /// Returns `false` if `cancel` fired first, or if the request can never be
    /// satisfied because it exceeds the bucket's capacity.
    pub async fn acquire(&self, tokens: u64, cancel: &CancellationToken) -> bool {
        if tokens > self.config.capacity {
            warn!(tokens, capacity = self.config.capacity, "request exceeds bucket capacity");
            return false;
        }

        loop {
            if self.try_acquire(tokens) {
                return true;
            }

            let wait = self.time_until_available(tokens).max(Duration::from_millis(1));
            debug!(?wait, "waiting for rate limit tokens");

            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Get the current number of available tokens
    pub fn available_tokens(&self) -> u64 {
        self.with_state(|state| state.tokens)
    }

}

impl TokenBucket<SystemClock> {
    /// Create a new token bucket with system clock
    pub fn new(
        capacity: u64,
        refill_amount: u64,
        refill_interval: Duration,
    ) -> Result<Self, String> {
        Self::with_clock(capacity, refill_amount, refill_interval, SystemClock)
    }
}

impl<C: Clock> Clone for TokenBucket<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C: Clock> std::fmt::Debug for TokenBucket<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucket").field("config", &self.config).finish_non_exhaustive()
    }
}
