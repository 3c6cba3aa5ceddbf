use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a signed download URL request.
///
/// The URL is not persisted; callers must request a new one after `expires_at`.
/// Failed requests carry the instant the failure was produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignedUrlResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SignedUrlResult {
    pub fn issued(url: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            url: Some(url),
            expires_at,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            expires_at: Utc::now(),
            error: Some(error.into()),
        }
    }
}
