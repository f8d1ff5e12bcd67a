//! Token-bucket rate limiting in front of the transport

use async_trait::async_trait;
use curlkit_common::{Clock, SystemClock, TokenBucket};
use curlkit_domain::{CurlError, RateLimitSettings, Result};
use tracing::debug;

use super::{Middleware, Next, RequestContext};
use crate::ports::{PlannedRequest, RawResponse};

/// Waits for one token per transmission
///
/// Placed inside the retry middleware, so every attempt pays. Clones share
/// the bucket.
#[derive(Debug, Clone)]
pub struct RateLimitMiddleware<C: Clock = SystemClock> {
    bucket: TokenBucket<C>,
}

impl RateLimitMiddleware<SystemClock> {
    pub fn new(settings: &RateLimitSettings) -> Result<Self> {
        let bucket =
            TokenBucket::new(settings.capacity, settings.refill_amount, settings.refill_interval)
                .map_err(|message| CurlError::malformed("rate_limit", message))?;
        Ok(Self { bucket })
    }
}

impl<C: Clock> RateLimitMiddleware<C> {
    pub fn from_bucket(bucket: TokenBucket<C>) -> Self {
        Self { bucket }
    }

    pub fn available(&self) -> u64 {
        self.bucket.available_tokens()
    }
}

#[async_trait]
impl<C: Clock> Middleware for RateLimitMiddleware<C> {
    async fn handle(
        &self,
        request: &PlannedRequest,
        ctx: &RequestContext,
        next: Next<'_>,
    ) -> Result<RawResponse> {
        if !self.bucket.acquire(1, &ctx.cancel).await {
            return Err(CurlError::Aborted { reason: "cancelled waiting for rate limit".into() });
        }
        debug!(request_id = %ctx.id, remaining = self.bucket.available_tokens(), "token acquired");
        next.run(request, ctx).await
    }
}
