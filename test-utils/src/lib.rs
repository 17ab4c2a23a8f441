//! Shared test utilities for the Secret Server SDK crates.
//!
//! This crate provides:
//! - Proptest generators for keys, slugs, ids and statuses
//! - A mock Secret Server built on `wiremock`
//! - Fixtures with sample REST API payloads

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
pub use mocks::MockSecretServer;
