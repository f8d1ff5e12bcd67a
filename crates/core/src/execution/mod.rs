//! Command execution service
//!
//! Ties the stages together: parse → plan → sign → middleware chain →
//! transport → classify → optional `-o` output. Every stage returns a
//! [`CurlError`]; parse and planning failures happen before any I/O.

use std::sync::Arc;
use std::time::{Duration, Instant};

use curlkit_common::{Clock, SystemClock};
use curlkit_domain::{CurlError, CurlOptions, CurlResponse, ExecutionConfig, Result, RetrySettings};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::command::parse_command;
use crate::pipeline::{
    Middleware, MiddlewareChain, RateLimitMiddleware, RequestContext, RetryMiddleware,
};
use crate::ports::{FileSystem, PlannedRequest, RawResponse, Transport};
use crate::request::RequestPlanner;
use crate::response::ClassificationRules;
use crate::signing::SigV4Signer;

/// Executes curl commands against a [`Transport`]
///
/// Holds only immutable state, so one executor can run any number of
/// commands concurrently.
pub struct CurlExecutor<C: Clock = SystemClock> {
    transport: Arc<dyn Transport>,
    fs: Arc<dyn FileSystem>,
    config: Arc<ExecutionConfig>,
    planner: RequestPlanner,
    signer: SigV4Signer<C>,
    chain: MiddlewareChain,
}

impl CurlExecutor<SystemClock> {
    /// Executor with the default chain (retry, then rate limiting if configured)
    pub fn new(
        transport: Arc<dyn Transport>,
        fs: Arc<dyn FileSystem>,
        config: ExecutionConfig,
    ) -> Result<Self> {
        Self::builder(transport, fs).config(config).build()
    }

    pub fn builder(
        transport: Arc<dyn Transport>,
        fs: Arc<dyn FileSystem>,
    ) -> CurlExecutorBuilder<SystemClock> {
        CurlExecutorBuilder {
            transport,
            fs,
            config: ExecutionConfig::default(),
            middlewares: Vec::new(),
            retry: RetryMiddleware::new(),
            clock: SystemClock,
        }
    }
}

impl<C: Clock> CurlExecutor<C> {
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Parse and run a curl command line
    pub async fn execute(&self, command: &str) -> Result<CurlResponse> {
        self.execute_with_cancel(command, CancellationToken::new()).await
    }

    /// As [`execute`](Self::execute), aborting with [`CurlError::Aborted`]
    /// once `cancel` fires
    pub async fn execute_with_cancel(
        &self,
        command: &str,
        cancel: CancellationToken,
    ) -> Result<CurlResponse> {
        let options = parse_command(command)?;
        self.execute_options_with_cancel(&options, cancel).await
    }

    /// Run already-parsed options
    pub async fn execute_options(&self, options: &CurlOptions) -> Result<CurlResponse> {
        self.execute_options_with_cancel(options, CancellationToken::new()).await
    }

    #[instrument(skip_all, fields(url = %options.url))]
    pub async fn execute_options_with_cancel(
        &self,
        options: &CurlOptions,
        cancel: CancellationToken,
    ) -> Result<CurlResponse> {
        let result = self.run(options, cancel).await;
        if let Err(err) = &result {
            if err.is_pre_transmission() {
                debug!(error = %err, code = err.curl_code(), "command rejected before sending");
            } else {
                warn!(error = %err, code = err.curl_code(), "exchange failed");
            }
        }
        result
    }

    async fn run(&self, options: &CurlOptions, cancel: CancellationToken) -> Result<CurlResponse> {
        let started = Instant::now();
        let mut request = self.planner.plan(options).await?;

        if let Some(signing) = &options.signing {
            let signature =
                self.signer.sign(&mut request, Some(signing), options.credentials.as_ref())?;
            if options.verbose {
                info!(canonical_request = %signature.canonical_request, "signing");
                info!(string_to_sign = %signature.string_to_sign, "signing");
            }
        }

        let ctx = RequestContext::new(cancel, self.retry_settings(options));
        if options.verbose {
            log_request(&request, &ctx);
        }

        let deadline = request.timeout;
        let raw = self.transmit(&request, &ctx, deadline).await?;
        if options.verbose {
            log_response(&raw, &ctx);
        }

        let failed = options.fails_on_http_error() && raw.status >= 400;
        if failed && !options.fail_with_body {
            return Err(http_status(&raw));
        }
        if let Some(path) = &options.output {
            self.fs.write(path, &raw.body).await.map_err(|err| CurlError::WriteFailed {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
            debug!(path = %path.display(), bytes = raw.body.len(), "wrote response body");
        }
        if failed {
            return Err(http_status(&raw));
        }

        let rules = ClassificationRules::from_options(options);
        Ok(rules.classify(raw, started.elapsed()))
    }

    /// Run the chain, racing cancellation and the whole-exchange deadline
    async fn transmit(
        &self,
        request: &PlannedRequest,
        ctx: &RequestContext,
        deadline: Option<Duration>,
    ) -> Result<RawResponse> {
        let guarded = async {
            tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    Err(CurlError::Aborted { reason: "cancelled by caller".into() })
                }
                result = self.chain.run(self.transport.as_ref(), request, ctx) => result,
            }
        };

        match deadline {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .unwrap_or(Err(CurlError::TimedOut { duration: limit })),
            None => guarded.await,
        }
    }

    /// Configured retry policy with this command's `--retry*` flags applied
    fn retry_settings(&self, options: &CurlOptions) -> RetrySettings {
        let mut settings = self.config.retry.clone();
        if let Some(retries) = options.retry {
            settings.retries = retries;
        }
        if let Some(delay) = options.retry_delay {
            // --retry-delay disables the exponential growth
            settings.initial_delay = delay;
            settings.max_delay = delay;
        }
        if let Some(budget) = options.retry_max_time {
            settings.max_total_time = Some(budget);
        }
        settings
    }
}

impl<C: Clock> std::fmt::Debug for CurlExecutor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurlExecutor")
            .field("config", &self.config)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

fn http_status(raw: &RawResponse) -> CurlError {
    CurlError::HttpStatus { status: raw.status, body: String::from_utf8_lossy(&raw.body).into() }
}

fn log_request(request: &PlannedRequest, ctx: &RequestContext) {
    info!(request_id = %ctx.id, "> {} {}", request.method, request.url);
    for (name, value) in request.headers.iter() {
        info!(request_id = %ctx.id, "> {name}: {value}");
    }
    if let Some(body) = &request.body {
        info!(request_id = %ctx.id, bytes = body.len(), "> body");
    }
}

fn log_response(raw: &RawResponse, ctx: &RequestContext) {
    info!(request_id = %ctx.id, "< {} from {}", raw.status, raw.url);
    for (name, value) in raw.headers.iter() {
        info!(request_id = %ctx.id, "< {name}: {value}");
    }
}

/// Assembles a [`CurlExecutor`]
pub struct CurlExecutorBuilder<C: Clock = SystemClock> {
    transport: Arc<dyn Transport>,
    fs: Arc<dyn FileSystem>,
    config: ExecutionConfig,
    middlewares: Vec<Arc<dyn Middleware>>,
    retry: RetryMiddleware,
    clock: C,
}

impl<C: Clock> CurlExecutorBuilder<C> {
    pub fn config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a middleware that runs outside the built-in retry and rate limit
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn retry(mut self, retry: RetryMiddleware) -> Self {
        self.retry = retry;
        self
    }

    /// Clock used for signing timestamps
    pub fn clock<C2: Clock>(self, clock: C2) -> CurlExecutorBuilder<C2> {
        CurlExecutorBuilder {
            transport: self.transport,
            fs: self.fs,
            config: self.config,
            middlewares: self.middlewares,
            retry: self.retry,
            clock,
        }
    }

    /// # Errors
    ///
    /// [`CurlError::MalformedCommand`] when the configuration is invalid.
    pub fn build(self) -> Result<CurlExecutor<C>> {
        self.config.validate().map_err(|message| CurlError::malformed("config", message))?;

        let mut chain = MiddlewareChain::new();
        for middleware in self.middlewares {
            chain.push(middleware);
        }
        chain.push(Arc::new(self.retry));
        if let Some(limits) = &self.config.rate_limit {
            chain.push(Arc::new(RateLimitMiddleware::new(limits)?));
        }

        let config = Arc::new(self.config);
        Ok(CurlExecutor {
            planner: RequestPlanner::new(Arc::clone(&self.fs), Arc::clone(&config)),
            signer: SigV4Signer::with_clock(self.clock),
            transport: self.transport,
            fs: self.fs,
            config,
            chain,
        })
    }
}
