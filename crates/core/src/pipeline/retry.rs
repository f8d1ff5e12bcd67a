//! Retry middleware
//!
//! Transient transport failures (DNS, connect, timeout) and the statuses in
//! [`RETRYABLE_STATUS_CODES`] are retried with exponential backoff. A
//! `Retry-After` header on a retryable response replaces the computed delay,
//! capped at the configured maximum. When attempts run out on a status, the
//! last response is returned as-is so the caller still sees it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curlkit_common::{BackoffStrategy, Jitter, RetryConfig, RetryDecision, RetryError};
use curlkit_common::{RetryExecutor, RetryPolicy};
use curlkit_domain::constants::{HEADER_RETRY_AFTER, RETRYABLE_STATUS_CODES};
use curlkit_domain::{CurlError, Result, RetrySettings};
use tracing::debug;

use super::{Middleware, Next, RequestContext};
use crate::ports::{PlannedRequest, RawResponse};

/// Outcome of one attempt that the retry loop may act on
#[derive(Debug)]
enum AttemptError {
    Failed(CurlError),
    RetryableStatus(RawResponse),
}

struct TransientPolicy {
    max_delay: Duration,
}

impl RetryPolicy<AttemptError> for TransientPolicy {
    fn should_retry(&self, error: &AttemptError, _attempt: u32) -> RetryDecision {
        match error {
            AttemptError::Failed(err) if err.is_retryable() => RetryDecision::Retry,
            AttemptError::Failed(_) => RetryDecision::Stop,
            AttemptError::RetryableStatus(response) => {
                match response.headers.get(HEADER_RETRY_AFTER).and_then(parse_retry_after) {
                    Some(delay) => RetryDecision::RetryAfter(delay.min(self.max_delay)),
                    None => RetryDecision::Retry,
                }
            }
        }
    }
}

/// `Retry-After` as delay-seconds or an HTTP date
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}

pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status)
}

/// Re-runs the rest of the chain per [`RequestContext::retry`]
#[derive(Debug, Clone)]
pub struct RetryMiddleware {
    jitter: Jitter,
}

impl Default for RetryMiddleware {
    fn default() -> Self {
        Self { jitter: Jitter::Equal }
    }
}

impl RetryMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays exactly as computed; deterministic timing for tests
    pub fn without_jitter() -> Self {
        Self { jitter: Jitter::None }
    }

    fn config_for(&self, settings: &RetrySettings) -> RetryConfig {
        RetryConfig {
            max_attempts: settings.retries.saturating_add(1),
            backoff: if settings.initial_delay >= settings.max_delay {
                BackoffStrategy::Fixed(settings.max_delay)
            } else {
                BackoffStrategy::Exponential {
                    initial_delay: settings.initial_delay,
                    base: 2.0,
                    max_delay: settings.max_delay,
                }
            },
            jitter: self.jitter,
            max_total_time: settings.max_total_time,
        }
    }
}

#[async_trait]
impl Middleware for RetryMiddleware {
    async fn handle(
        &self,
        request: &PlannedRequest,
        ctx: &RequestContext,
        next: Next<'_>,
    ) -> Result<RawResponse> {
        let settings = &ctx.retry;
        if settings.retries == 0 {
            return next.run(request, ctx).await;
        }

        let executor = RetryExecutor::new(
            self.config_for(settings),
            TransientPolicy { max_delay: settings.max_delay },
        );
        let mut attempts: u32 = 0;
        let outcome = executor
            .execute_with_cancel(&ctx.cancel, || {
                attempts += 1;
                async move {
                    match next.run(request, ctx).await {
                        Ok(response) if is_retryable_status(response.status) => {
                            debug!(
                                request_id = %ctx.id,
                                status = response.status,
                                "retryable status"
                            );
                            Err(AttemptError::RetryableStatus(response))
                        }
                        Ok(response) => Ok(response),
                        Err(err) => Err(AttemptError::Failed(err)),
                    }
                }
            })
            .await;

        match outcome {
            Ok(response) => Ok(response),
            Err(RetryError::AttemptsExhausted { attempts, last }) => exhausted(attempts, last),
            Err(RetryError::NonRetryable { error, .. }) => match error {
                AttemptError::Failed(err) => Err(err),
                AttemptError::RetryableStatus(response) => Ok(response),
            },
            Err(RetryError::TimeoutExceeded { elapsed, last }) => match last {
                Some(last) => exhausted(attempts, last),
                None => Err(CurlError::TimedOut { duration: elapsed }),
            },
            Err(RetryError::Cancelled { .. }) => {
                Err(CurlError::Aborted { reason: "cancelled while retrying".into() })
            }
            Err(RetryError::InvalidConfiguration { message }) => {
                Err(CurlError::malformed("--retry", message))
            }
        }
    }
}

fn exhausted(attempts: u32, last: AttemptError) -> Result<RawResponse> {
    match last {
        AttemptError::RetryableStatus(response) => Ok(response),
        AttemptError::Failed(err) if attempts <= 1 => Err(err),
        AttemptError::Failed(err) => {
            Err(CurlError::RetriesExhausted { attempts, last: Box::new(err) })
        }
    }
}
