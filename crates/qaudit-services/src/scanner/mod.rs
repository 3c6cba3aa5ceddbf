//! Malware scanning adapter.
//!
//! [`VirusScanService`] fronts two independent [`ScanBackend`]s: a content engine
//! (`clamav`, signature matching) and a reputation engine (`virustotal`, extension
//! heuristics). `hybrid` runs both concurrently and merges their verdicts with
//! [`combine_verdicts`]. Whatever happens inside a backend, callers receive a
//! [`ScanResult`].

#[cfg(feature = "clamav")]
mod clamav;
mod extension;
mod signature;

#[cfg(feature = "clamav")]
pub use clamav::ClamAvBackend;
pub use extension::ExtensionHeuristicScanner;
pub use signature::SignatureScanner;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use qaudit_core::models::{ScanEngineKind, ScanResult, ScanStatus};
use qaudit_core::ScanConfig;

use crate::input::FileInput;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scan backend unavailable: {0}")]
    Unavailable(String),

    #[error("Scan failed: {0}")]
    Failed(String),

    #[error("Scan timeout (exceeded {0} ms)")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{engine}: {source}")]
    Engine {
        engine: ScanEngineKind,
        source: Box<ScanError>,
    },
}

/// Verdict of one backend. Backends report failures as `Err(ScanError)`, so the
/// status here is never `Error`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanVerdict {
    pub status: ScanStatus,
    pub threats: Vec<String>,
    pub details: Option<String>,
    pub scan_id: Option<String>,
}

impl ScanVerdict {
    pub fn clean() -> Self {
        Self {
            status: ScanStatus::Clean,
            threats: Vec::new(),
            details: None,
            scan_id: None,
        }
    }

    pub fn infected(threats: Vec<String>) -> Self {
        Self {
            status: ScanStatus::Infected,
            threats,
            details: None,
            scan_id: None,
        }
    }

    pub fn suspected(threats: Vec<String>, details: impl Into<String>) -> Self {
        Self {
            status: ScanStatus::Suspected,
            threats,
            details: Some(details.into()),
            scan_id: None,
        }
    }
}

/// Pluggable malware-detection backend.
#[async_trait]
pub trait ScanBackend: Send + Sync {
    /// Engine this backend stands for (`clamav` or `virustotal`).
    fn engine(&self) -> ScanEngineKind;

    async fn scan(&self, data: &[u8], file_name: Option<&str>) -> Result<ScanVerdict, ScanError>;
}

/// Merge two independent verdicts.
///
/// Precedence: any infected wins; otherwise any suspected; otherwise clean only
/// when both are clean; otherwise error.
pub fn combine_verdicts(
    first: Result<ScanVerdict, ScanError>,
    second: Result<ScanVerdict, ScanError>,
) -> Result<ScanVerdict, ScanError> {
    let outcomes = [first, second];
    let verdicts: Vec<&ScanVerdict> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    let errors: Vec<String> = outcomes
        .iter()
        .filter_map(|r| r.as_ref().err().map(|e| e.to_string()))
        .collect();

    let threats: Vec<String> = verdicts
        .iter()
        .flat_map(|v| v.threats.iter().cloned())
        .collect();
    let details: Vec<&str> = verdicts.iter().filter_map(|v| v.details.as_deref()).collect();
    let scan_id = verdicts.iter().find_map(|v| v.scan_id.clone());

    let status = if verdicts.iter().any(|v| v.status == ScanStatus::Infected) {
        ScanStatus::Infected
    } else if verdicts.iter().any(|v| v.status == ScanStatus::Suspected) {
        ScanStatus::Suspected
    } else if errors.is_empty() && verdicts.iter().all(|v| v.status == ScanStatus::Clean) {
        ScanStatus::Clean
    } else {
        return Err(ScanError::Failed(errors.join("; ")));
    };

    let details = if details.is_empty() && errors.is_empty() {
        None
    } else {
        Some(
            details
                .into_iter()
                .map(str::to_string)
                .chain(errors)
                .collect::<Vec<_>>()
                .join("; "),
        )
    };

    Ok(ScanVerdict {
        status,
        threats,
        details,
        scan_id,
    })
}

/// Malware scanning adapter.
pub struct VirusScanService {
    config: ScanConfig,
    content_engine: Arc<dyn ScanBackend>,
    reputation_engine: Arc<dyn ScanBackend>,
}

impl VirusScanService {
    pub fn new(
        config: ScanConfig,
        content_engine: Arc<dyn ScanBackend>,
        reputation_engine: Arc<dyn ScanBackend>,
    ) -> Self {
        Self {
            config,
            content_engine,
            reputation_engine,
        }
    }

    /// Build the adapter with the backends implied by `config`.
    ///
    /// A configured `clamav_host` selects the live ClamAV daemon; otherwise the
    /// signature simulation stands in for it.
    pub fn from_config(config: ScanConfig) -> Self {
        let content_engine: Arc<dyn ScanBackend> = match config.clamav_host.clone() {
            #[cfg(feature = "clamav")]
            Some(host) => Arc::new(ClamAvBackend::with_timeout(
                host,
                config.clamav_port,
                config.timeout_ms,
            )),
            #[cfg(not(feature = "clamav"))]
            Some(_) => {
                tracing::warn!(
                    "CLAMAV_HOST is set but ClamAV support is not compiled in, using signature scanner"
                );
                Arc::new(SignatureScanner::default())
            }
            None => Arc::new(SignatureScanner::default()),
        };
        let reputation_engine: Arc<dyn ScanBackend> =
            Arc::new(ExtensionHeuristicScanner::default());
        Self::new(config, content_engine, reputation_engine)
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Engine reported on results produced by this adapter.
    pub fn engine(&self) -> ScanEngineKind {
        self.config.preferred_engine
    }

    /// Scan a file or buffer. Never fails; problems are reported as `error` results.
    #[tracing::instrument(skip(self, input), fields(
        engine = %self.config.preferred_engine,
        file_name = input.display_name().unwrap_or("<buffer>")
    ))]
    pub async fn scan(&self, input: &FileInput) -> ScanResult {
        let start = Instant::now();
        let engine = self.config.preferred_engine;

        if !self.config.enabled {
            if self.config.fail_closed {
                tracing::warn!("Virus scanning disabled, withholding file (fail-closed)");
                return ScanResult::error(
                    engine,
                    0,
                    "Virus scanning is disabled by configuration; file withheld (fail-closed)",
                );
            }
            tracing::debug!("Virus scanning disabled, reporting clean (fail-open)");
            return ScanResult::clean(engine, 0)
                .with_details("Virus scanning is disabled by configuration; file not scanned");
        }

        let size = match input.size().await {
            Ok(size) => size,
            Err(e) => {
                tracing::error!(error = %e, "Failed to stat file for scanning");
                return ScanResult::error(
                    engine,
                    elapsed_ms(start),
                    format!("Failed to read file: {}", e),
                );
            }
        };

        let max = self.config.max_file_size_bytes;
        if size > max {
            tracing::warn!(size_bytes = size, max_bytes = max, "File too large to scan");
            return ScanResult::error(
                engine,
                elapsed_ms(start),
                format!(
                    "File size {} bytes exceeds maximum scan size of {} bytes",
                    size, max
                ),
            );
        }

        let data = match input.read_limited(max).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::warn!(max_bytes = max, "File grew past the scan limit while reading");
                return ScanResult::error(
                    engine,
                    elapsed_ms(start),
                    format!("File size exceeds maximum scan size of {} bytes", max),
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read file for scanning");
                return ScanResult::error(
                    engine,
                    elapsed_ms(start),
                    format!("Failed to read file: {}", e),
                );
            }
        };
        let file_name = input.display_name();

        let verdict = match engine {
            ScanEngineKind::ClamAv => self.run(&self.content_engine, &data, file_name).await,
            ScanEngineKind::VirusTotal => {
                self.run(&self.reputation_engine, &data, file_name).await
            }
            ScanEngineKind::Hybrid => {
                let (content, reputation) = tokio::join!(
                    self.run(&self.content_engine, &data, file_name),
                    self.run(&self.reputation_engine, &data, file_name)
                );
                combine_verdicts(content, reputation)
            }
        };

        let scan_time_ms = elapsed_ms(start);
        match verdict {
            Ok(verdict) => {
                match verdict.status {
                    ScanStatus::Clean => {
                        tracing::info!(duration_ms = scan_time_ms, "File scan completed: clean")
                    }
                    status => tracing::warn!(
                        duration_ms = scan_time_ms,
                        status = %status,
                        threats = ?verdict.threats,
                        "File scan flagged content"
                    ),
                }
                ScanResult {
                    status: verdict.status,
                    engine,
                    scan_time_ms,
                    threats: verdict.threats,
                    details: verdict.details,
                    scan_id: verdict.scan_id,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, duration_ms = scan_time_ms, "File scan failed");
                ScanResult::error(engine, scan_time_ms, e.to_string())
            }
        }
    }

    async fn run(
        &self,
        backend: &Arc<dyn ScanBackend>,
        data: &[u8],
        file_name: Option<&str>,
    ) -> Result<ScanVerdict, ScanError> {
        let engine = backend.engine();
        let timeout_ms = self.config.timeout_ms;
        let result =
            match tokio::time::timeout(self.config.timeout(), backend.scan(data, file_name)).await {
                Ok(result) => result,
                Err(_) => Err(ScanError::Timeout(timeout_ms)),
            };
        match result {
            Ok(verdict) => {
                tracing::debug!(engine = %engine, status = %verdict.status, "Scan backend finished");
                Ok(verdict)
            }
            Err(e) => {
                tracing::warn!(engine = %engine, error = %e, "Scan backend failed");
                Err(ScanError::Engine {
                    engine,
                    source: Box::new(e),
                })
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Backend returning a fixed outcome and counting calls.
    struct FixedBackend {
        engine: ScanEngineKind,
        outcome: Option<ScanStatus>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl FixedBackend {
        fn new(engine: ScanEngineKind, outcome: Option<ScanStatus>) -> Arc<Self> {
            Arc::new(Self {
                engine,
                outcome,
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(engine: ScanEngineKind, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                engine,
                outcome: Some(ScanStatus::Clean),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ScanBackend for FixedBackend {
        fn engine(&self) -> ScanEngineKind {
            self.engine
        }

        async fn scan(
            &self,
            _data: &[u8],
            _file_name: Option<&str>,
        ) -> Result<ScanVerdict, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.outcome {
                Some(ScanStatus::Clean) => Ok(ScanVerdict::clean()),
                Some(ScanStatus::Infected) => Ok(ScanVerdict::infected(vec!["Test.Virus".into()])),
                Some(ScanStatus::Suspected) => Ok(ScanVerdict::suspected(
                    vec!["Suspicious.Extension.exe".into()],
                    "suspicious extension",
                )),
                _ => Err(ScanError::Failed("engine exploded".to_string())),
            }
        }
    }

    fn config(engine: ScanEngineKind) -> ScanConfig {
        ScanConfig {
            preferred_engine: engine,
            ..Default::default()
        }
    }

    fn service(engine: ScanEngineKind) -> VirusScanService {
        VirusScanService::from_config(config(engine))
    }

    fn outcome(status: Option<ScanStatus>) -> Result<ScanVerdict, ScanError> {
        match status {
            Some(ScanStatus::Clean) => Ok(ScanVerdict::clean()),
            Some(ScanStatus::Infected) => Ok(ScanVerdict::infected(vec!["X".into()])),
            Some(ScanStatus::Suspected) => Ok(ScanVerdict::suspected(vec!["Y".into()], "y")),
            _ => Err(ScanError::Failed("down".to_string())),
        }
    }

    #[test]
    fn hybrid_precedence_over_all_pairs() {
        let cases = [
            Some(ScanStatus::Clean),
            Some(ScanStatus::Infected),
            Some(ScanStatus::Suspected),
            None,
        ];
        for a in cases {
            for b in cases {
                let combined = combine_verdicts(outcome(a), outcome(b));
                let expected = if a == Some(ScanStatus::Infected) || b == Some(ScanStatus::Infected)
                {
                    ScanStatus::Infected
                } else if a == Some(ScanStatus::Suspected) || b == Some(ScanStatus::Suspected) {
                    ScanStatus::Suspected
                } else if a == Some(ScanStatus::Clean) && b == Some(ScanStatus::Clean) {
                    ScanStatus::Clean
                } else {
                    ScanStatus::Error
                };
                let actual = combined.map(|v| v.status).unwrap_or(ScanStatus::Error);
                assert_eq!(actual, expected, "pair {:?} / {:?}", a, b);
            }
        }
    }

    #[tokio::test]
    async fn eicar_buffer_is_infected() {
        let input = FileInput::from_bytes(
            b"header EICAR-STANDARD-ANTIVIRUS-TEST-FILE trailer".to_vec(),
            Some("sample.txt".to_string()),
        );
        let result = service(ScanEngineKind::ClamAv).scan(&input).await;
        assert_eq!(result.status, ScanStatus::Infected);
        assert!(result
            .threats
            .contains(&"EICAR-STANDARD-ANTIVIRUS-TEST-FILE".to_string()));
        assert_eq!(result.engine, ScanEngineKind::ClamAv);
    }

    #[tokio::test]
    async fn hybrid_flags_suspicious_extension_with_benign_content() {
        let input = FileInput::from_bytes(
            b"just a harmless payload".to_vec(),
            Some("payload.exe".to_string()),
        );
        let result = service(ScanEngineKind::Hybrid).scan(&input).await;
        assert_eq!(result.status, ScanStatus::Suspected);
        assert_eq!(result.engine, ScanEngineKind::Hybrid);
        assert!(result.scan_id.is_some());
    }

    #[tokio::test]
    async fn disabled_scanning_fails_open_by_default() {
        let mut cfg = config(ScanEngineKind::ClamAv);
        cfg.enabled = false;
        let backend = FixedBackend::new(ScanEngineKind::ClamAv, Some(ScanStatus::Infected));
        let svc = VirusScanService::new(cfg, backend.clone(), backend.clone());
        let result = svc
            .scan(&FileInput::from_bytes(b"EICAR".to_vec(), None))
            .await;
        assert_eq!(result.status, ScanStatus::Clean);
        assert!(result.details.unwrap().contains("disabled"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn disabled_scanning_fail_closed_withholds() {
        let mut cfg = config(ScanEngineKind::ClamAv);
        cfg.enabled = false;
        cfg.fail_closed = true;
        let result = VirusScanService::from_config(cfg)
            .scan(&FileInput::from_bytes(b"data".to_vec(), None))
            .await;
        assert_eq!(result.status, ScanStatus::Error);
    }

    #[tokio::test]
    async fn oversized_input_never_reaches_engine() {
        let mut cfg = config(ScanEngineKind::Hybrid);
        cfg.max_file_size_bytes = 8;
        let backend = FixedBackend::new(ScanEngineKind::ClamAv, Some(ScanStatus::Clean));
        let svc = VirusScanService::new(cfg, backend.clone(), backend.clone());
        let input = FileInput::from_bytes(vec![0u8; 64], Some("big.bin".to_string()));

        for _ in 0..2 {
            let result = svc.scan(&input).await;
            assert_eq!(result.status, ScanStatus::Error);
            let details = result.details.unwrap();
            assert!(details.contains("64"));
            assert!(details.contains("8"));
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn backend_failure_becomes_error_result() {
        let failing = FixedBackend::new(ScanEngineKind::ClamAv, None);
        let clean = FixedBackend::new(ScanEngineKind::VirusTotal, Some(ScanStatus::Clean));
        let svc = VirusScanService::new(config(ScanEngineKind::ClamAv), failing, clean);
        let result = svc
            .scan(&FileInput::from_bytes(b"data".to_vec(), None))
            .await;
        assert_eq!(result.status, ScanStatus::Error);
        assert!(result.details.unwrap().contains("engine exploded"));
    }

    #[tokio::test]
    async fn hybrid_with_one_failed_engine_is_error_unless_flagged() {
        let failing = FixedBackend::new(ScanEngineKind::ClamAv, None);
        let clean = FixedBackend::new(ScanEngineKind::VirusTotal, Some(ScanStatus::Clean));
        let svc = VirusScanService::new(config(ScanEngineKind::Hybrid), failing.clone(), clean);
        let result = svc
            .scan(&FileInput::from_bytes(b"data".to_vec(), None))
            .await;
        assert_eq!(result.status, ScanStatus::Error);

        let suspected = FixedBackend::new(ScanEngineKind::VirusTotal, Some(ScanStatus::Suspected));
        let svc = VirusScanService::new(config(ScanEngineKind::Hybrid), failing, suspected);
        let result = svc
            .scan(&FileInput::from_bytes(b"data".to_vec(), None))
            .await;
        assert_eq!(result.status, ScanStatus::Suspected);
        assert!(result.details.unwrap().contains("engine exploded"));
    }

    #[tokio::test]
    async fn backend_failures_name_their_engine() {
        let content = FixedBackend::new(ScanEngineKind::ClamAv, None);
        let reputation = FixedBackend::new(ScanEngineKind::VirusTotal, None);
        let svc = VirusScanService::new(config(ScanEngineKind::Hybrid), content, reputation);
        let result = svc
            .scan(&FileInput::from_bytes(b"data".to_vec(), None))
            .await;
        assert_eq!(result.status, ScanStatus::Error);
        let details = result.details.unwrap();
        assert!(details.contains("clamav: Scan failed: engine exploded"));
        assert!(details.contains("virustotal: Scan failed: engine exploded"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let mut cfg = config(ScanEngineKind::ClamAv);
        cfg.timeout_ms = 100;
        let slow = FixedBackend::slow(ScanEngineKind::ClamAv, Duration::from_secs(5));
        let svc = VirusScanService::new(cfg, slow.clone(), slow);
        let result = svc
            .scan(&FileInput::from_bytes(b"data".to_vec(), None))
            .await;
        assert_eq!(result.status, ScanStatus::Error);
        assert!(result.details.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn scans_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, b"quarterly controls walkthrough")
            .await
            .unwrap();
        let result = service(ScanEngineKind::Hybrid)
            .scan(&FileInput::from_path(&path))
            .await;
        assert_eq!(result.status, ScanStatus::Clean);
    }
}
