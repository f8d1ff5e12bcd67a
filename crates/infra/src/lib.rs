//! # curlkit Infrastructure
//!
//! Implementations of the core ports plus process-level setup.
//!
//! This crate contains:
//! - The reqwest-backed [`Transport`](curlkit_core::Transport)
//! - The `tokio::fs` [`FileSystem`](curlkit_core::FileSystem)
//! - Configuration loading (files and `CURLKIT_*` variables)
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `curlkit-core`
//! - Contains all "impure" code (network, file system, environment)

pub mod config;
pub mod errors;
pub mod fs;
pub mod http;
pub mod observability;

use std::sync::Arc;

use curlkit_core::CurlExecutor;
use curlkit_domain::{ExecutionConfig, Result};

// Re-export commonly used items
pub use errors::ConfigError;
pub use fs::LocalFileSystem;
pub use http::ReqwestTransport;
pub use observability::init_tracing;

/// Executor wired to the network and the local file system, configured from
/// [`config::load`].
///
/// # Errors
/// Returns `MalformedCommand` (exit code 2) if the configuration is invalid.
pub fn default_executor() -> Result<CurlExecutor> {
    let config = config::load()?;
    default_executor_with(config)
}

/// Executor wired to the network and the local file system.
///
/// # Errors
/// Returns `MalformedCommand` (exit code 2) if `config` fails validation.
pub fn default_executor_with(config: ExecutionConfig) -> Result<CurlExecutor> {
    CurlExecutor::new(Arc::new(ReqwestTransport::new()), Arc::new(LocalFileSystem), config)
}
