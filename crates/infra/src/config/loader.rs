//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Start from [`ExecutionConfig::default`]
//! 2. Overlay a config file: `CURLKIT_CONFIG` if set, otherwise the first
//!    probed `curlkit.{toml,json}`
//! 3. Overlay `CURLKIT_*` environment variables
//! 4. Validate
//!
//! ## Environment Variables
//! - `CURLKIT_CONFIG`: Explicit config file path
//! - `CURLKIT_TIMEOUT_MS`: Whole-exchange timeout when `-m` is absent
//! - `CURLKIT_CONNECT_TIMEOUT_MS`: Connect timeout
//! - `CURLKIT_USER_AGENT`: Default `User-Agent`
//! - `CURLKIT_INSECURE`: Skip TLS verification by default (true/false)
//! - `CURLKIT_MAX_REDIRECTS`: Redirect limit for `-L`
//! - `CURLKIT_RETRIES`: Retries when `--retry` is absent
//! - `CURLKIT_RETRY_DELAY_MS`: Initial backoff
//! - `CURLKIT_RETRY_MAX_DELAY_MS`: Backoff ceiling
//! - `CURLKIT_LOG`: Log filter used when `RUST_LOG` is unset
//! - `CURLKIT_LOG_FORMAT`: `pretty`, `compact` or `json`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./curlkit.toml` or `./curlkit.json` (current working directory)
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use curlkit_domain::ExecutionConfig;

use crate::errors::ConfigError;

const CONFIG_PATH_VAR: &str = "CURLKIT_CONFIG";
const FILE_NAMES: [&str; 2] = ["curlkit.toml", "curlkit.json"];

/// Load configuration: defaults, then file, then environment
///
/// A missing config file is not an error; an explicit `CURLKIT_CONFIG` that
/// does not exist is.
///
/// # Errors
/// Returns [`ConfigError`] if the file cannot be read or parsed, an
/// environment variable holds an invalid value, or the result fails
/// validation.
pub fn load() -> Result<ExecutionConfig, ConfigError> {
    let file = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => Some(PathBuf::from(path)),
        Err(_) => probe_config_paths(),
    };

    let mut config = match file {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, using defaults");
            ExecutionConfig::default()
        }
    };

    apply_env_overrides(&mut config)?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Defaults overlaid with environment variables only
///
/// # Errors
/// Returns [`ConfigError`] for unparseable or invalid values.
pub fn load_from_env() -> Result<ExecutionConfig, ConfigError> {
    let mut config = ExecutionConfig::default();
    apply_env_overrides(&mut config)?;
    config.validate().map_err(ConfigError::Invalid)?;
    tracing::info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Fields the file
/// omits keep their defaults. Format is detected by extension.
///
/// # Errors
/// Returns [`ConfigError`] if the file is missing, unreadable or invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<ExecutionConfig, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound(p.display().to_string()));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ConfigError::NotFound("no curlkit.toml or curlkit.json in standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.display().to_string(),
        source,
    })?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<ExecutionConfig, ConfigError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let display = path.display().to_string();

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
            format: "TOML",
            path: display,
            message: e.to_string(),
        }),
        "json" => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
            format: "JSON",
            path: display,
            message: e.to_string(),
        }),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Probe the standard locations for a config file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

/// Overlay `CURLKIT_*` variables onto `config`
///
/// Unset variables leave the current value alone.
///
/// # Errors
/// Returns [`ConfigError::InvalidValue`] for values that do not parse.
pub fn apply_env_overrides(config: &mut ExecutionConfig) -> Result<(), ConfigError> {
    if let Some(ms) = env_parse::<u64>("CURLKIT_TIMEOUT_MS")? {
        config.http.timeout = (ms > 0).then(|| Duration::from_millis(ms));
    }
    if let Some(ms) = env_parse::<u64>("CURLKIT_CONNECT_TIMEOUT_MS")? {
        config.http.connect_timeout = Duration::from_millis(ms);
    }
    if let Some(agent) = env_var("CURLKIT_USER_AGENT") {
        config.http.user_agent = agent;
    }
    config.http.insecure = env_bool("CURLKIT_INSECURE", config.http.insecure);
    if let Some(limit) = env_parse("CURLKIT_MAX_REDIRECTS")? {
        config.http.max_redirects = limit;
    }

    if let Some(retries) = env_parse("CURLKIT_RETRIES")? {
        config.retry.retries = retries;
    }
    if let Some(ms) = env_parse("CURLKIT_RETRY_DELAY_MS")? {
        config.retry.initial_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = env_parse("CURLKIT_RETRY_MAX_DELAY_MS")? {
        config.retry.max_delay = Duration::from_millis(ms);
    }

    if let Some(filter) = env_var("CURLKIT_LOG") {
        config.logging.filter = filter;
    }
    if let Some(format) = env_parse("CURLKIT_LOG_FORMAT")? {
        config.logging.format = format;
    }

    Ok(())
}

/// Non-empty environment variable
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
