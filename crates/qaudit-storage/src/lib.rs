//! QAudit Storage Library
//!
//! This crate provides the object store abstraction used to hand out time-boxed
//! download links for evidence files, plus the S3 implementation.
//!
//! # Download key format
//!
//! Download keys are non-guessable: `evidence/{evidence_id}/{hash16}/{file_name}`, where
//! `hash16` is the first 16 hex characters of a SHA-256 over the evidence id, file name,
//! requesting user and a millisecond timestamp. Key generation is centralized in the
//! `keys` module.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_signer;
pub use keys::{attachment_disposition, evidence_download_key, sanitize_filename};
#[cfg(feature = "storage-s3")]
pub use s3::S3UrlSigner;
pub use traits::{StorageError, StorageResult, UrlSigner};
