//! Shared building blocks for the curlkit crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: serde helpers
//! - `runtime`: async resilience primitives (retry, rate limiting, clocks)
//! - `observability`: tracing instrumentation (implied by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use resilience::{
    BackoffStrategy, Clock, Jitter, MockClock, RetryConfig, RetryDecision, RetryError,
    RetryExecutor, RetryPolicy, RetryResult, SystemClock, TokenBucket,
};
#[cfg(feature = "foundation")]
pub use utils::serde::{duration_millis, option_duration_millis};
