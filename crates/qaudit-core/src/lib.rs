//! QAudit Core Library
//!
//! This crate provides the evidence domain models, error types, configuration and
//! host collaborator traits shared by the scanning, extraction, storage and
//! processing crates.

pub mod config;
pub mod error;
pub mod file_types;
pub mod hooks;
pub mod models;

// Re-export commonly used types
pub use config::{
    BatchConfig, EvidenceProcessingConfig, ExtractionConfig, ObjectStoreConfig, OcrBackendKind,
    ScanConfig, TelemetryConfig,
};
pub use error::{AppError, AppResult, LogLevel};
pub use hooks::{EvidenceRepository, NoOpEvidenceRepository};
