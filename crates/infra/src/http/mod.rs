//! HTTP transport backed by reqwest

pub mod transport;

pub use transport::{ReqwestTransport, DEFAULT_MAX_CLIENTS};
