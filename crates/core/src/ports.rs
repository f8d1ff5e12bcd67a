//! Port interfaces for the I/O the pipeline depends on
//!
//! The planner reads `@file` payloads and the executor writes `-o` output
//! through [`FileSystem`]; the middleware chain ends in a [`Transport`]. Both
//! are implemented in `curlkit-infra`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use curlkit_domain::{HeaderList, Result};
use url::Url;

/// Connection-level settings that decide which HTTP client can serve a
/// request
///
/// Equal settings may share one pooled client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportSettings {
    pub follow_redirects: bool,
    pub max_redirects: u32,
    pub insecure: bool,
    pub proxy: Option<String>,
    pub connect_timeout: Duration,
    pub compressed: bool,
}

/// A request ready for the wire: the URL is parsed, every `@file` is
/// resolved and the body is fully buffered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRequest {
    pub method: String,
    pub url: Url,
    pub headers: HeaderList,
    pub body: Option<Vec<u8>>,
    pub settings: TransportSettings,
    /// Budget for a single transport attempt
    pub timeout: Option<Duration>,
}

impl PlannedRequest {
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }
}

/// Response as received, before the body is classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderList,
    pub url: String,
    pub body: Vec<u8>,
}

/// Sends one HTTP request
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &PlannedRequest) -> Result<RawResponse>;
}

/// Local file access, binary only
///
/// Paths are used exactly as given; relative paths resolve against the
/// process working directory.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    async fn write(&self, path: &Path, contents: &[u8]) -> std::io::Result<()>;
}
