//! Object store abstraction trait
//!
//! This module defines the signer trait that object store backends implement to
//! hand out temporary download links.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Presign failed: {0}")]
    PresignFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Backing object store client able to sign temporary GET URLs.
///
/// Implementations must not perform the download themselves; they only produce a
/// URL that grants access to `storage_key` until `expires_in` has elapsed.
#[async_trait]
pub trait UrlSigner: Send + Sync {
    /// Generate a presigned GET URL for `storage_key`.
    ///
    /// `content_disposition` is returned to the browser as the response
    /// `Content-Disposition` header so the file is downloaded rather than rendered.
    async fn presign_get(
        &self,
        storage_key: &str,
        content_disposition: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
