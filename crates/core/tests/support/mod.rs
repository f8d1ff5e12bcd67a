//! Shared test helpers for `curlkit-core` integration tests.
//!
//! These helpers provide in-memory port implementations so the pipeline
//! tests can focus on behaviour instead of boilerplate.

pub mod ports;
