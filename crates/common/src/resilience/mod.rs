//! Resilience patterns for fault tolerance
//!
//! This module provides **generic, reusable** primitives that the request
//! pipeline builds its policies on:
//! - **Retry**: fixed or exponential backoff with jitter,
//!   attempt and time budgets, and prompt cancellation
//! - **Rate limiting**: a shared token bucket with an async `acquire`
//! - **Clock**: time abstraction so both can be tested deterministically
//!
//! Nothing here knows about HTTP; error types stay generic (`<E>`) and the
//! caller supplies the policy that classifies them.

pub mod clock;
pub mod rate_limiter;
pub mod retry;

pub use clock::{Clock, MockClock, SystemClock};
pub use rate_limiter::{TokenBucket, TokenBucketConfig};
pub use retry::{
    BackoffStrategy, Jitter, RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryPolicy,
    RetryResult,
};
