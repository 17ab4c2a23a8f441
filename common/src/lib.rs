//! Shared helpers for the Secret Server SDK crates.
//!
//! This crate provides:
//! - HTTP transport configuration and client building
//! - Tracing subscriber setup for binaries and tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod http;
pub mod tracing_config;

pub use http::{HttpConfig, build_http_client};
pub use tracing_config::{TracingConfig, init_tracing, try_init_tracing};
