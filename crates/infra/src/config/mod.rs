//! Configuration loading
//!
//! Builds an [`ExecutionConfig`](curlkit_domain::ExecutionConfig) from
//! defaults, an optional config file and environment overrides.

pub mod loader;

// Re-export commonly used items
pub use loader::{apply_env_overrides, load, load_from_env, load_from_file, probe_config_paths};
