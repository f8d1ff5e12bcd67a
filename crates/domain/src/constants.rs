//! Protocol and default constants
//!
//! Centralized location for the literal values the parser, planner, signer
//! and executor agree on.

// Defaults applied when neither the command nor the configuration says
// otherwise
pub const DEFAULT_USER_AGENT: &str = concat!("curlkit/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_SCHEME: &str = "http://";
pub const DEFAULT_MAX_REDIRECTS: u32 = 50;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 300_000;

// Retry defaults (curl doubles a one second delay, capped at ten minutes)
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
pub const MAX_RETRY_DELAY_MS: u64 = 600_000;
pub const RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

// Media types
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";
pub const CONTENT_TYPE_MULTIPART: &str = "multipart/form-data";

// Header names
pub const HEADER_ACCEPT: &str = "Accept";
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_COOKIE: &str = "Cookie";
pub const HEADER_HOST: &str = "Host";
pub const HEADER_REFERER: &str = "Referer";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";
pub const HEADER_USER_AGENT: &str = "User-Agent";

// Signing
pub const DEFAULT_SIGNING_REGION: &str = "us-east-1";
pub const SIGNING_ALGORITHM_SUFFIX: &str = "4-HMAC-SHA256";
pub const SIGNING_REQUEST_SUFFIX: &str = "4_request";
pub const SIGNING_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
pub const SIGNING_DATE_STAMP_FORMAT: &str = "%Y%m%d";

// Multipart
pub const MULTIPART_BOUNDARY_PREFIX: &str = "------------------------curlkit";
