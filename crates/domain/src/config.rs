//! Execution configuration
//!
//! Process-wide defaults (timeouts, TLS verification, retry policy) live in
//! one value that is passed to the executor explicitly. Flags on a command
//! line override these per request.

use std::time::Duration;

use curlkit_common::{duration_millis, option_duration_millis};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_MAX_REDIRECTS, DEFAULT_RETRY_DELAY_MS, DEFAULT_USER_AGENT,
    MAX_RETRY_DELAY_MS,
};
use crate::impl_keyword_conversions;

/// Top-level configuration for executing curl commands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub http: HttpConfig,
    pub retry: RetrySettings,
    pub rate_limit: Option<RateLimitSettings>,
    pub logging: LoggingConfig,
}

/// Transport defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-exchange budget when `-m` is not given; `None` means unbounded
    #[serde(with = "option_duration_millis")]
    pub timeout: Option<Duration>,
    #[serde(with = "duration_millis")]
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub insecure: bool,
    pub max_redirects: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            insecure: false,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// Retry policy defaults; `--retry`, `--retry-delay` and `--retry-max-time`
/// override them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt; zero disables retrying
    pub retries: u32,
    #[serde(with = "duration_millis")]
    pub initial_delay: Duration,
    #[serde(with = "duration_millis")]
    pub max_delay: Duration,
    #[serde(with = "option_duration_millis")]
    pub max_total_time: Option<Duration>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            retries: 0,
            initial_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_delay: Duration::from_millis(MAX_RETRY_DELAY_MS),
            max_total_time: None,
        }
    }
}

/// Token bucket shared by every request issued through one executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub capacity: u64,
    pub refill_amount: u64,
    #[serde(with = "duration_millis")]
    pub refill_interval: Duration,
}

/// Output format for the tracing subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl_keyword_conversions!(LogFormat {
    Pretty => "pretty" | "text",
    Compact => "compact",
    Json => "json",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), format: LogFormat::Pretty }
    }
}

impl ExecutionConfig {
    /// Reject values that would make the pipeline misbehave
    pub fn validate(&self) -> Result<(), String> {
        if self.http.user_agent.trim().is_empty() {
            return Err("http.user_agent must not be empty".to_string());
        }
        if self.retry.initial_delay > self.retry.max_delay {
            return Err("retry.initial_delay must not exceed retry.max_delay".to_string());
        }
        if let Some(limit) = &self.rate_limit {
            if limit.capacity == 0 || limit.refill_amount == 0 {
                return Err("rate_limit capacity and refill_amount must be positive".to_string());
            }
            if limit.refill_interval.is_zero() {
                return Err("rate_limit.refill_interval must be greater than zero".to_string());
            }
        }
        Ok(())
    }
}
