//! Infrastructure error types and their mapping onto [`CurlError`]

mod conversions;

pub use conversions::IntoCurlError;
use curlkit_domain::CurlError;
use thiserror::Error;

/// Failures while assembling an [`ExecutionConfig`](curlkit_domain::ExecutionConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {format} in {path}: {message}")]
    Parse { format: &'static str, path: String, message: String },

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for CurlError {
    fn from(value: ConfigError) -> Self {
        CurlError::malformed("config", value.to_string())
    }
}
