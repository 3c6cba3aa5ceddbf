use crate::traits::{StorageError, StorageResult, UrlSigner};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use qaudit_core::ObjectStoreConfig;
use std::time::Duration;

/// S3 URL signer
#[derive(Clone)]
pub struct S3UrlSigner {
    client: Client,
    bucket: String,
}

impl S3UrlSigner {
    /// Create a new S3UrlSigner from object store configuration.
    ///
    /// Explicit access keys take precedence over the default AWS credential chain.
    /// A custom `endpoint` switches to path-style addressing for S3-compatible
    /// providers (e.g. "http://localhost:9000" for MinIO).
    pub async fn new(config: &ObjectStoreConfig) -> StorageResult<Self> {
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| StorageError::ConfigError("S3 bucket is not configured".to_string()))?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key_id.clone(),
                secret.clone(),
                None,
                None,
                "qaudit-env",
            ));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(ref endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint.clone()).force_path_style(true);
        }

        Ok(S3UrlSigner {
            client: Client::from_conf(builder.build()),
            bucket,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl UrlSigner for S3UrlSigner {
    #[tracing::instrument(skip(self, content_disposition), fields(
        aws.service.name = "s3",
        aws.s3.operation = "GetObject",
        s3.bucket = %self.bucket,
        s3.key = %storage_key
    ))]
    async fn presign_get(
        &self,
        storage_key: &str,
        content_disposition: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        if storage_key.is_empty() || storage_key.starts_with('/') || storage_key.contains("..") {
            return Err(StorageError::InvalidKey(storage_key.to_string()));
        }

        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .response_content_disposition(content_disposition)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        tracing::info!(
            expires_in_seconds = expires_in.as_secs(),
            "Generated presigned GET URL"
        );

        Ok(request.uri().to_string())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
