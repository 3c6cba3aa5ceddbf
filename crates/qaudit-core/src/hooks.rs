//! Host application collaborator traits
//!
//! The evidence records, their scan status and extracted text are persisted by the
//! host application. The processing core only calls into these traits; the host
//! provides the implementation.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{EvidenceRecord, EvidenceScanStatus, ExtractionResult, ProcessingStats};

/// Trait for the evidence persistence operations needed by the processing pipeline
#[async_trait]
pub trait EvidenceRepository: Send + Sync {
    /// Get an evidence record by ID
    async fn get_evidence_record(&self, evidence_id: &str) -> Result<Option<EvidenceRecord>>;

    /// Persist the scan status derived from the latest scan
    async fn update_evidence_scan_status(
        &self,
        evidence_id: &str,
        status: EvidenceScanStatus,
    ) -> Result<()>;

    /// Persist a successful extraction (text, confidence, language, timing, pages, words)
    async fn store_extraction_result(
        &self,
        evidence_id: &str,
        extraction: &ExtractionResult,
    ) -> Result<()>;

    /// Aggregate processing counters for an engagement.
    ///
    /// Hosts without aggregation support get all-zero counters.
    async fn processing_stats(&self, _engagement_id: &str) -> Result<ProcessingStats> {
        Ok(ProcessingStats::default())
    }
}

/// Repository that knows no records and discards every write
pub struct NoOpEvidenceRepository;

#[async_trait]
impl EvidenceRepository for NoOpEvidenceRepository {
    async fn get_evidence_record(&self, _evidence_id: &str) -> Result<Option<EvidenceRecord>> {
        Ok(None)
    }

    async fn update_evidence_scan_status(
        &self,
        _evidence_id: &str,
        _status: EvidenceScanStatus,
    ) -> Result<()> {
        Ok(())
    }

    async fn store_extraction_result(
        &self,
        _evidence_id: &str,
        _extraction: &ExtractionResult,
    ) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_repository_has_no_records_and_zero_stats() {
        let repo = NoOpEvidenceRepository;
        assert!(repo.get_evidence_record("ev-1").await.unwrap().is_none());
        assert!(repo
            .update_evidence_scan_status("ev-1", EvidenceScanStatus::Clean)
            .await
            .is_ok());
        assert_eq!(
            repo.processing_stats("eng-1").await.unwrap(),
            ProcessingStats::default()
        );
    }
}
