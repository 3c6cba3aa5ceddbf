//! Signed download URL issuance.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

use qaudit_core::models::SignedUrlResult;
use qaudit_core::ObjectStoreConfig;
use qaudit_storage::{
    attachment_disposition, create_signer, evidence_download_key, StorageResult, UrlSigner,
};

/// Object store gateway issuing time-boxed download links.
#[derive(Clone)]
pub struct DownloadUrlService {
    config: ObjectStoreConfig,
    signer: Option<Arc<dyn UrlSigner>>,
}

impl DownloadUrlService {
    /// Gateway over an explicit signer. `config.enabled` still governs issuance.
    pub fn new(config: ObjectStoreConfig, signer: Arc<dyn UrlSigner>) -> Self {
        Self {
            config,
            signer: Some(signer),
        }
    }

    /// Gateway that declines every request.
    pub fn disabled() -> Self {
        Self {
            config: ObjectStoreConfig::default(),
            signer: None,
        }
    }

    pub async fn from_config(config: ObjectStoreConfig) -> StorageResult<Self> {
        let signer = create_signer(&config).await?;
        Ok(Self { config, signer })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.signer.is_some()
    }

    /// Issue a signed GET URL for an evidence file. Never fails; signer errors
    /// come back as an unsuccessful result.
    ///
    /// `ttl` defaults to the configured signed URL lifetime (one hour).
    #[tracing::instrument(skip(self), fields(backend = tracing::field::Empty))]
    pub async fn issue_download_url(
        &self,
        evidence_id: &str,
        file_name: &str,
        requesting_user: &str,
        requesting_ip: Option<&str>,
        ttl: Option<Duration>,
    ) -> SignedUrlResult {
        let signer = match (&self.signer, self.config.enabled) {
            (Some(signer), true) => signer,
            _ => {
                tracing::debug!("Object store disabled, not issuing download URL");
                return SignedUrlResult::failed(
                    "Object store integration is disabled by configuration",
                );
            }
        };
        tracing::Span::current().record("backend", signer.backend_name());

        let ttl = ttl.unwrap_or_else(|| self.config.signed_url_ttl());
        let issued_at = Utc::now();
        let key = evidence_download_key(
            evidence_id,
            file_name,
            requesting_user,
            issued_at.timestamp_millis(),
        );
        let disposition = attachment_disposition(file_name);

        let expires_at = match ChronoDuration::from_std(ttl)
            .ok()
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
        {
            Some(expires_at) => expires_at,
            None => {
                return SignedUrlResult::failed(format!(
                    "Invalid signed URL lifetime: {} seconds",
                    ttl.as_secs()
                ))
            }
        };

        match signer.presign_get(&key, &disposition, ttl).await {
            Ok(url) => {
                tracing::info!(
                    evidence_id = %evidence_id,
                    requesting_user = %requesting_user,
                    requesting_ip = requesting_ip.unwrap_or("unknown"),
                    expires_at = %expires_at,
                    "Issued signed download URL"
                );
                SignedUrlResult::issued(url, expires_at)
            }
            Err(e) => {
                tracing::error!(error = %e, evidence_id = %evidence_id, "Failed to issue signed URL");
                SignedUrlResult::failed(format!("Failed to generate signed URL: {}", e))
            }
        }
    }
}
