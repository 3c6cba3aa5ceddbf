//! Signer factory
//!
//! Builds the configured object store signer.

use crate::traits::{StorageResult, UrlSigner};
use qaudit_core::ObjectStoreConfig;
use std::sync::Arc;

/// Create the signer for `config`, or `None` when the object store is disabled.
pub async fn create_signer(config: &ObjectStoreConfig) -> StorageResult<Option<Arc<dyn UrlSigner>>> {
    if !config.enabled {
        tracing::info!("Object store disabled, signed download URLs will not be issued");
        return Ok(None);
    }

    #[cfg(feature = "storage-s3")]
    {
        let signer = crate::s3::S3UrlSigner::new(config).await?;
        tracing::info!(bucket = %signer.bucket(), region = %config.region, "S3 signer initialized");
        let signer: Arc<dyn UrlSigner> = Arc::new(signer);
        Ok(Some(signer))
    }

    #[cfg(not(feature = "storage-s3"))]
    {
        Err(crate::traits::StorageError::ConfigError(
            "S3 support not compiled in (enable the storage-s3 feature)".to_string(),
        ))
    }
}
