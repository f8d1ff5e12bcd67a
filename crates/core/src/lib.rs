//! # curlkit Core
//!
//! Pure request logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The curl command tokenizer, flag table and parser
//! - Request planning (`@file` data resolution, multipart bodies)
//! - Response body classification (binary vs text)
//! - Provider-parameterized SigV4 signing
//! - The middleware chain and the executor service
//! - Port interfaces (traits) for the transport and the file system
//!
//! ## Architecture Principles
//! - Only depends on `curlkit-common` and `curlkit-domain`
//! - No HTTP client or file system code
//! - All I/O via the traits in [`ports`]

pub mod command;
pub mod execution;
pub mod pipeline;
pub mod ports;
pub mod request;
pub mod response;
pub mod signing;

pub use command::{parse_args, parse_command, tokenize};
pub use execution::{CurlExecutor, CurlExecutorBuilder};
pub use pipeline::{
    Middleware, MiddlewareChain, Next, RateLimitMiddleware, RequestContext, RetryMiddleware,
};
pub use ports::{FileSystem, PlannedRequest, RawResponse, Transport, TransportSettings};
pub use request::RequestPlanner;
pub use response::{BodyKind, ClassificationRules};
pub use signing::{sign_request, SigV4Signer, SignatureOutput};
