//! Middleware chain wrapped around the transport
//!
//! A chain is an ordered list of [`Middleware`]. Each one receives the
//! request and a [`Next`] cursor over the rest of the chain; it may return
//! early without calling onward, or call onward any number of times (the
//! retry middleware calls it once per attempt). Chains hold no per-request
//! state, so one chain serves any number of concurrent requests.

pub mod rate_limit;
pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use curlkit_domain::{Result, RetrySettings};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use self::rate_limit::RateLimitMiddleware;
pub use self::retry::RetryMiddleware;
use crate::ports::{PlannedRequest, RawResponse, Transport};

/// Per-request values shared by every middleware
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: Uuid,
    pub cancel: CancellationToken,
    /// Retry policy for this request, after `--retry*` flags are applied
    pub retry: RetrySettings,
}

impl RequestContext {
    pub fn new(cancel: CancellationToken, retry: RetrySettings) -> Self {
        Self { id: Uuid::new_v4(), cancel, retry }
    }
}

/// One policy in the chain
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        request: &PlannedRequest,
        ctx: &RequestContext,
        next: Next<'_>,
    ) -> Result<RawResponse>;
}

/// Cursor over the remainder of a chain
#[derive(Clone, Copy)]
pub struct Next<'a> {
    transport: &'a dyn Transport,
    middlewares: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub fn new(transport: &'a dyn Transport, middlewares: &'a [Arc<dyn Middleware>]) -> Self {
        Self { transport, middlewares }
    }

    /// Run the rest of the chain, ending at the transport
    pub async fn run(self, request: &PlannedRequest, ctx: &RequestContext) -> Result<RawResponse> {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                current.handle(request, ctx, Next::new(self.transport, rest)).await
            }
            None => self.transport.send(request).await,
        }
    }
}

/// Ordered middleware list
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware; earlier entries wrap later ones
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub async fn run(
        &self,
        transport: &dyn Transport,
        request: &PlannedRequest,
        ctx: &RequestContext,
    ) -> Result<RawResponse> {
        Next::new(transport, &self.middlewares).run(request, ctx).await
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain").field("len", &self.middlewares.len()).finish()
    }
}
