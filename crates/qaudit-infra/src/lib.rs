//! QAudit Infrastructure
//!
//! Process-level plumbing shared by binaries: tracing subscriber setup and
//! teardown.

pub mod telemetry;

pub use telemetry::{init_telemetry, shutdown_telemetry};
