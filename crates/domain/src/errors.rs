//! Error taxonomy shared by every pipeline stage
//!
//! One flat enum replaces curl's per-exit-code error catalogue. Each variant
//! keeps only the payload a caller needs to act on (the offending flag, the
//! literal file path, the host, the status code) and maps back to curl's
//! numeric exit code through [`CurlError::curl_code`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for curlkit
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurlError {
    /// The command line could not be tokenized or a flag received a bad value
    #[error("malformed command near '{text}': {message}")]
    MalformedCommand { text: String, message: String },

    /// A flag that is not in the flag table
    #[error("option {flag}: is unknown")]
    UnknownOption { flag: String },

    /// The URL could not be parsed
    #[error("URL rejected: malformed input to a URL function: {url}")]
    InvalidUrl { url: String },

    /// An `@file` reference (or `-F`/`-T` file) could not be read; `path` is
    /// exactly what the command line said
    #[error("failed to read file '{path}': {message}")]
    FileUnreadable { path: String, message: String },

    /// The response body could not be written to the `-o` destination
    #[error("failed writing body to '{path}': {message}")]
    WriteFailed { path: String, message: String },

    /// DNS resolution failed
    #[error("could not resolve host: {host}")]
    HostUnresolvable { host: String },

    /// TCP connection (or any other transport-level failure) failed
    #[error("failed to connect to {host} port {port}: {message}")]
    ConnectionFailed { host: String, port: u16, message: String },

    /// The peer certificate could not be verified
    #[error("TLS certificate verification failed: {message}")]
    TlsVerificationFailed { message: String },

    /// The redirect limit was exceeded
    #[error("maximum redirects followed: {message}")]
    TooManyRedirects { message: String },

    /// The server answered with an error status and fail-on-error was
    /// requested
    #[error("the requested URL returned error: {status}")]
    HttpStatus { status: u16, body: String },

    /// The configured time budget ran out
    #[error("operation timed out after {} milliseconds", duration.as_millis())]
    TimedOut { duration: Duration },

    /// The caller cancelled the exchange
    #[error("operation aborted: {reason}")]
    Aborted { reason: String },

    /// A signing input is missing; a configuration defect, never retried
    #[error("request signing requires {field}")]
    SigningPrecondition { field: String },

    /// The retry policy gave up; `last` is the final underlying error
    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<CurlError> },
}

impl CurlError {
    /// Create a malformed-command error
    pub fn malformed(text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedCommand { text: text.into(), message: message.into() }
    }

    /// Create a file-read error that keeps the path exactly as given
    pub fn file_unreadable(path: impl Into<String>, source: &std::io::Error) -> Self {
        Self::FileUnreadable { path: path.into(), message: source.to_string() }
    }

    /// Create a signing precondition error for a missing input
    pub fn signing_precondition(field: impl Into<String>) -> Self {
        Self::SigningPrecondition { field: field.into() }
    }

    /// The classic curl exit code for this error
    pub fn curl_code(&self) -> u8 {
        match self {
            Self::MalformedCommand { .. } | Self::UnknownOption { .. } => 2,
            Self::InvalidUrl { .. } => 3,
            Self::HostUnresolvable { .. } => 6,
            Self::ConnectionFailed { .. } => 7,
            Self::HttpStatus { .. } => 22,
            Self::WriteFailed { .. } => 23,
            Self::FileUnreadable { .. } => 26,
            Self::TimedOut { .. } => 28,
            Self::Aborted { .. } => 42,
            Self::SigningPrecondition { .. } => 43,
            Self::TooManyRedirects { .. } => 47,
            Self::TlsVerificationFailed { .. } => 60,
            Self::RetriesExhausted { last, .. } => last.curl_code(),
        }
    }

    /// Whether a retry policy may transparently try again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HostUnresolvable { .. } | Self::ConnectionFailed { .. } | Self::TimedOut { .. }
        )
    }

    /// Whether this error was raised before any network activity
    pub fn is_pre_transmission(&self) -> bool {
        matches!(
            self,
            Self::MalformedCommand { .. }
                | Self::UnknownOption { .. }
                | Self::InvalidUrl { .. }
                | Self::FileUnreadable { .. }
                | Self::SigningPrecondition { .. }
        )
    }

    /// The innermost error, looking through `RetriesExhausted`
    pub fn root(&self) -> &CurlError {
        match self {
            Self::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

/// Result type alias for curlkit operations
pub type Result<T> = std::result::Result<T, CurlError>;
