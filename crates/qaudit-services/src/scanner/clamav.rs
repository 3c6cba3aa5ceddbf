use async_trait::async_trait;
use clamav_client::{clean, Tcp};
use std::str;
use std::time::{Duration, Instant};

use qaudit_core::models::ScanEngineKind;

use super::{ScanBackend, ScanError, ScanVerdict};

/// Content engine backed by a live `clamd` daemon over TCP.
#[derive(Clone, Debug)]
pub struct ClamAvBackend {
    host: String,
    port: u16,
    timeout_ms: u64,
}

impl ClamAvBackend {
    pub fn new(host: String, port: u16) -> Self {
        Self::with_timeout(host, port, 30_000)
    }

    /// Create with a custom per-scan timeout (large files, slow daemons).
    pub fn with_timeout(host: String, port: u16, timeout_ms: u64) -> Self {
        Self {
            host,
            port,
            timeout_ms,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Pull the signature name out of a `stream: Eicar-Signature FOUND` reply.
fn parse_virus_name(response: &[u8]) -> String {
    let response = str::from_utf8(response).map(str::trim).unwrap_or("unknown");
    if !response.contains("FOUND") {
        return "unknown".to_string();
    }
    response
        .split(':')
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or("unknown")
        .to_string()
}

#[async_trait]
impl ScanBackend for ClamAvBackend {
    fn engine(&self) -> ScanEngineKind {
        ScanEngineKind::ClamAv
    }

    /// Blocking client call runs inside `spawn_blocking`.
    async fn scan(&self, data: &[u8], _file_name: Option<&str>) -> Result<ScanVerdict, ScanError> {
        let start = Instant::now();
        tracing::debug!(host = %self.host, port = %self.port, "Starting ClamAV scan");
        let data = data.to_vec();
        let address = self.address();
        let timeout_ms = self.timeout_ms;

        let task = tokio::task::spawn_blocking(move || {
            let connection = Tcp {
                host_address: address.as_str(),
            };
            let response = clamav_client::scan_buffer(data.as_slice(), connection, None)
                .map_err(|e| ScanError::Unavailable(format!("ClamAV scan error: {}", e)))?;
            let is_clean = clean(&response).map_err(|e| {
                ScanError::Failed(format!("Failed to parse ClamAV response: {}", e))
            })?;
            Ok::<_, ScanError>((is_clean, response))
        });

        let (is_clean, response) =
            match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
                Ok(Ok(result)) => result?,
                Ok(Err(e)) => {
                    return Err(ScanError::Failed(format!(
                        "ClamAV scan task join error: {}",
                        e
                    )))
                }
                Err(_) => return Err(ScanError::Timeout(timeout_ms)),
            };

        if is_clean {
            tracing::info!(
                duration_ms = start.elapsed().as_millis(),
                "ClamAV scan completed: clean"
            );
            return Ok(ScanVerdict::clean());
        }

        let virus_name = parse_virus_name(&response);
        tracing::warn!(
            duration_ms = start.elapsed().as_millis(),
            virus = %virus_name,
            "ClamAV detected virus"
        );
        Ok(ScanVerdict::infected(vec![virus_name]))
    }
}
