//! Evidence processing orchestrator.
//!
//! Per item, strictly in order: look up the record → scan → report status →
//! extract text (image/PDF only, unless the scan errored) → issue a download
//! URL (clean scans only) → build the outcome. Extraction and URL failures are
//! non-fatal and land in `errors`; only the scan decides `success` together
//! with an empty error list. Nothing, not even a panic, escapes.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use qaudit_core::file_types::{extension_of, is_ocr_eligible, normalize_extension};
use qaudit_core::models::{
    EvidenceRecord, EvidenceScanStatus, EvidenceStage, ProcessingOutcome, ProcessingStats,
    ScanStatus,
};
use qaudit_core::{AppError, AppResult, BatchConfig, EvidenceRepository};
use qaudit_services::{DownloadUrlService, FileInput, TextExtractionService, VirusScanService};

use crate::stages::StageTrace;

/// Identity recorded with every issued download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: String,
    pub ip_address: Option<String>,
}

impl Requester {
    pub fn new(user_id: impl Into<String>, ip_address: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ip_address,
        }
    }
}

impl Default for Requester {
    fn default() -> Self {
        Self::new("system", None)
    }
}

/// Evidence processing orchestrator.
///
/// Adapters are shared through `Arc`, so the extraction session owned by the
/// [`TextExtractionService`] can be reused by other callers and released with
/// [`EvidenceProcessor::shutdown`].
pub struct EvidenceProcessor {
    repository: Arc<dyn EvidenceRepository>,
    scanner: Arc<VirusScanService>,
    extractor: Arc<TextExtractionService>,
    downloads: Arc<DownloadUrlService>,
    batch: BatchConfig,
    requester: Requester,
}

impl EvidenceProcessor {
    pub fn new(
        repository: Arc<dyn EvidenceRepository>,
        scanner: Arc<VirusScanService>,
        extractor: Arc<TextExtractionService>,
        downloads: Arc<DownloadUrlService>,
        batch: BatchConfig,
    ) -> Self {
        Self {
            repository,
            scanner,
            extractor,
            downloads,
            batch,
            requester: Requester::default(),
        }
    }

    /// Set the identity used when issuing download URLs.
    pub fn with_requester(mut self, requester: Requester) -> Self {
        self.requester = requester;
        self
    }

    pub fn requester(&self) -> &Requester {
        &self.requester
    }

    /// Process one evidence file stored at `file_path`.
    #[tracing::instrument(skip(self, file_path))]
    pub async fn process_evidence_file(
        &self,
        evidence_id: &str,
        file_path: &Path,
    ) -> ProcessingOutcome {
        self.process_guarded(evidence_id, Some(file_path)).await
    }

    /// Process evidence ids one at a time, pausing between items.
    ///
    /// Returns one outcome per id, in order. A failed item never stops the batch.
    #[tracing::instrument(skip(self, evidence_ids), fields(batch_size = evidence_ids.len()))]
    pub async fn process_batch_evidence(&self, evidence_ids: &[String]) -> Vec<ProcessingOutcome> {
        let start = Instant::now();
        let delay = self.batch.delay();
        let mut outcomes = Vec::with_capacity(evidence_ids.len());

        for (index, evidence_id) in evidence_ids.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let outcome = self
                .process_guarded(evidence_id, None)
                .instrument(tracing::info_span!("evidence_item", evidence_id = %evidence_id))
                .await;
            outcomes.push(outcome);
        }

        let stats = ProcessingStats::from_outcomes(&outcomes);
        tracing::info!(
            total = stats.total_files,
            clean = stats.clean_files,
            suspicious = stats.suspicious_files,
            failed = stats.failed_files,
            duration_ms = start.elapsed().as_millis() as u64,
            "Evidence batch processed"
        );
        outcomes
    }

    /// Processing counters for an engagement, as aggregated by the repository.
    pub async fn get_processing_stats(&self, engagement_id: &str) -> ProcessingStats {
        match self.repository.processing_stats(engagement_id).await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(engagement_id = %engagement_id, error = %e, "Failed to load processing stats");
                ProcessingStats::default()
            }
        }
    }

    /// Release the extraction session.
    pub async fn shutdown(&self) {
        self.extractor.shutdown().await;
    }

    /// Run the pipeline, turning errors and panics into failure outcomes.
    async fn process_guarded(&self, evidence_id: &str, file_path: Option<&Path>) -> ProcessingOutcome {
        let start = Instant::now();
        let result = AssertUnwindSafe(self.run_pipeline(evidence_id, file_path, start))
            .catch_unwind()
            .await;

        let error = match result {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(e)) => e,
            Err(panic) => AppError::Internal(format!(
                "Evidence processing panicked: {}",
                panic_message(panic.as_ref())
            )),
        };

        error.log("Evidence processing failed");
        let file_name = file_path
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        ProcessingOutcome::failed(
            evidence_id,
            file_name,
            self.scanner.engine(),
            start.elapsed().as_millis() as u64,
            error.to_string(),
        )
    }

    async fn run_pipeline(
        &self,
        evidence_id: &str,
        file_path: Option<&Path>,
        start: Instant,
    ) -> AppResult<ProcessingOutcome> {
        let record = self
            .repository
            .get_evidence_record(evidence_id)
            .await
            .map_err(|e| AppError::Repository(format!("{:#}", e)))?
            .ok_or_else(|| AppError::NotFound(evidence_id.to_string()))?;

        let path = match file_path {
            Some(path) => path.to_path_buf(),
            None => self.resolve_storage_path(&record)?,
        };

        let mut trace = StageTrace::new(evidence_id);
        let mut errors = Vec::new();
        let ext = record_extension(&record);
        let input = FileInput::from_path(path).with_display_name(display_name(&record, &ext));

        // Scan
        trace.advance(EvidenceStage::Scanning);
        let scan = self.scanner.scan(&input).await;
        trace.advance(EvidenceStage::after_scan(scan.status));

        let persisted = EvidenceScanStatus::from(scan.status);
        if let Err(e) = self
            .repository
            .update_evidence_scan_status(&record.id, persisted)
            .await
        {
            tracing::warn!(error = %e, status = %persisted, "Failed to update evidence scan status");
        }

        // Extract
        let mut extraction = None;
        let should_extract = scan.status != ScanStatus::Error
            && self.extractor.is_enabled()
            && is_ocr_eligible(&record.mime_type, &ext);
        if should_extract {
            trace.advance(EvidenceStage::Extracting);
            let result = self.extractor.extract(&input).await;
            if result.success {
                trace.advance(EvidenceStage::Extracted);
                if let Err(e) = self
                    .repository
                    .store_extraction_result(&record.id, &result)
                    .await
                {
                    tracing::warn!(error = %e, "Failed to store extraction result");
                }
            } else {
                trace.advance(EvidenceStage::ExtractionFailed);
                errors.push(format!(
                    "Text extraction failed: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                ));
            }
            extraction = Some(result);
        }

        // Issue download URL
        let mut download_url = None;
        if scan.status == ScanStatus::Clean && self.downloads.is_enabled() {
            let signed = self
                .downloads
                .issue_download_url(
                    &record.id,
                    &record.file_name,
                    &self.requester.user_id,
                    self.requester.ip_address.as_deref(),
                    None,
                )
                .await;
            if signed.success {
                trace.advance(EvidenceStage::UrlIssued);
                download_url = signed.url;
            } else {
                trace.advance(EvidenceStage::UrlIssuanceFailed);
                errors.push(format!(
                    "Download URL issuance failed: {}",
                    signed.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }

        let success = scan.status == ScanStatus::Clean && errors.is_empty();
        let processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            scan_status = %scan.status,
            extracted = extraction.as_ref().is_some_and(|e| e.success),
            url_issued = download_url.is_some(),
            non_fatal_errors = errors.len(),
            duration_ms = processing_time_ms,
            success,
            "Evidence processed"
        );

        Ok(ProcessingOutcome {
            evidence_id: record.id,
            file_name: record.file_name,
            virus_scan: scan,
            extraction,
            signed_url_issued: download_url.is_some(),
            download_url,
            processing_time_ms,
            success,
            errors,
            stages: trace.finish(),
        })
    }

    /// Resolve a record's storage key under the configured storage root.
    fn resolve_storage_path(&self, record: &EvidenceRecord) -> AppResult<PathBuf> {
        let key = Path::new(&record.storage_key);
        let escapes_root = key
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if record.storage_key.is_empty() || escapes_root {
            return Err(AppError::InvalidInput(format!(
                "Invalid storage key for evidence {}: {:?}",
                record.id, record.storage_key
            )));
        }
        Ok(self.batch.storage_root.join(key))
    }
}

/// Extension from the record, falling back to the file name.
fn record_extension(record: &EvidenceRecord) -> String {
    let ext = normalize_extension(&record.file_ext);
    if ext.is_empty() {
        extension_of(&record.file_name).unwrap_or_default()
    } else {
        ext
    }
}

/// File name carrying the record's extension, so adapters see the right type.
fn display_name(record: &EvidenceRecord, ext: &str) -> String {
    if ext.is_empty() || extension_of(&record.file_name).as_deref() == Some(ext) {
        record.file_name.clone()
    } else {
        format!("{}.{}", record.file_name, ext)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
