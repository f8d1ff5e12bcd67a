//! # curlkit Domain
//!
//! Data types shared by every curlkit crate.
//!
//! This crate contains:
//! - The parsed command model (`CurlOptions`, `HeaderList`, `SigningConfig`)
//! - The executed exchange (`CurlResponse`, `ResponseBody`)
//! - The error taxonomy (`CurlError`) and its curl exit codes
//! - Execution configuration and protocol constants
//!
//! ## Architecture
//! - Depends only on `curlkit-common`'s foundation tier
//! - No I/O, no async runtime
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
