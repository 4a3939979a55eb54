//! Common test utilities for netgraph-core
//!
//! Shared fixtures and tracing setup for the integration tests.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once; honors `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
