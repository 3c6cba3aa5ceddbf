//! Tracing initialization
//!
//! Logs go to stderr, either human-readable or as JSON lines, filtered by
//! `RUST_LOG` with the configured default filter as fallback.

mod init_basic;

pub use init_basic::{build_filter, init_telemetry, shutdown_telemetry};
