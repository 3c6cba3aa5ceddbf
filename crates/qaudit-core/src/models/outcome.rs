use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::{ExtractionResult, ScanEngineKind, ScanResult, ScanStatus};

/// Steps of a single evidence item's journey through the pipeline.
///
/// Every path ends in `OutcomeRecorded`. There are no retry transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStage {
    Pending,
    Scanning,
    ScannedClean,
    ScannedDirty,
    ScanError,
    Extracting,
    Extracted,
    ExtractionFailed,
    UrlIssued,
    UrlIssuanceFailed,
    OutcomeRecorded,
}

impl EvidenceStage {
    /// Terminal stage reached by a finished scan.
    pub fn after_scan(status: ScanStatus) -> Self {
        match status {
            ScanStatus::Clean => EvidenceStage::ScannedClean,
            ScanStatus::Infected | ScanStatus::Suspected => EvidenceStage::ScannedDirty,
            ScanStatus::Error => EvidenceStage::ScanError,
        }
    }

    /// Whether the pipeline may move from `self` to `next`.
    pub fn can_transition_to(self, next: EvidenceStage) -> bool {
        use EvidenceStage::*;
        match (self, next) {
            (_, OutcomeRecorded) => self != OutcomeRecorded,
            (Pending, Scanning) => true,
            (Scanning, ScannedClean | ScannedDirty | ScanError) => true,
            (ScannedClean | ScannedDirty, Extracting) => true,
            (Extracting, Extracted | ExtractionFailed) => true,
            (ScannedClean, UrlIssued | UrlIssuanceFailed) => true,
            // URL issuance follows extraction when the scan was clean; the
            // orchestrator guards the clean requirement.
            (Extracted | ExtractionFailed, UrlIssued | UrlIssuanceFailed) => true,
            _ => false,
        }
    }
}

impl Display for EvidenceStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            EvidenceStage::Pending => "pending",
            EvidenceStage::Scanning => "scanning",
            EvidenceStage::ScannedClean => "scanned_clean",
            EvidenceStage::ScannedDirty => "scanned_dirty",
            EvidenceStage::ScanError => "scan_error",
            EvidenceStage::Extracting => "extracting",
            EvidenceStage::Extracted => "extracted",
            EvidenceStage::ExtractionFailed => "extraction_failed",
            EvidenceStage::UrlIssued => "url_issued",
            EvidenceStage::UrlIssuanceFailed => "url_issuance_failed",
            EvidenceStage::OutcomeRecorded => "outcome_recorded",
        };
        write!(f, "{}", s)
    }
}

/// Aggregated result of processing one evidence file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessingOutcome {
    pub evidence_id: String,
    pub file_name: String,
    pub virus_scan: ScanResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionResult>,
    pub signed_url_issued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub processing_time_ms: u64,
    pub success: bool,
    pub errors: Vec<String>,
    pub stages: Vec<EvidenceStage>,
}

impl ProcessingOutcome {
    /// Failure outcome for a pipeline that could not complete.
    ///
    /// The scan result is synthesized with status `error` and the message is
    /// the only entry in `errors`.
    pub fn failed(
        evidence_id: impl Into<String>,
        file_name: impl Into<String>,
        engine: ScanEngineKind,
        processing_time_ms: u64,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            evidence_id: evidence_id.into(),
            file_name: file_name.into(),
            virus_scan: ScanResult::error(engine, 0, message.clone()),
            extraction: None,
            signed_url_issued: false,
            download_url: None,
            processing_time_ms,
            success: false,
            errors: vec![message],
            stages: vec![EvidenceStage::Pending, EvidenceStage::OutcomeRecorded],
        }
    }

    pub fn final_stage(&self) -> Option<EvidenceStage> {
        self.stages.last().copied()
    }
}

/// Per-engagement processing counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessingStats {
    pub total_files: u64,
    pub scanned_files: u64,
    pub extracted_files: u64,
    pub clean_files: u64,
    pub suspicious_files: u64,
    pub failed_files: u64,
}

impl ProcessingStats {
    /// Summarise a set of outcomes, e.g. the result of one batch run.
    pub fn from_outcomes(outcomes: &[ProcessingOutcome]) -> Self {
        let mut stats = ProcessingStats {
            total_files: outcomes.len() as u64,
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome.virus_scan.status {
                ScanStatus::Clean => {
                    stats.scanned_files += 1;
                    stats.clean_files += 1;
                }
                ScanStatus::Infected | ScanStatus::Suspected => {
                    stats.scanned_files += 1;
                    stats.suspicious_files += 1;
                }
                ScanStatus::Error => {}
            }
            if outcome.extraction.as_ref().is_some_and(|e| e.success) {
                stats.extracted_files += 1;
            }
            if !outcome.success {
                stats.failed_files += 1;
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_carries_error_scan() {
        let outcome =
            ProcessingOutcome::failed("ev-1", "", ScanEngineKind::ClamAv, 3, "not found: ev-1");
        assert!(!outcome.success);
        assert_eq!(outcome.virus_scan.status, ScanStatus::Error);
        assert_eq!(outcome.errors, vec!["not found: ev-1".to_string()]);
        assert!(outcome.download_url.is_none());
        assert_eq!(outcome.final_stage(), Some(EvidenceStage::OutcomeRecorded));
    }

    #[test]
    fn stage_transitions_follow_state_machine() {
        use EvidenceStage::*;
        assert!(Pending.can_transition_to(Scanning));
        assert!(Scanning.can_transition_to(ScanError));
        assert!(ScannedDirty.can_transition_to(Extracting));
        assert!(!ScanError.can_transition_to(Extracting));
        assert!(!ScannedDirty.can_transition_to(UrlIssued));
        assert!(ScannedClean.can_transition_to(UrlIssuanceFailed));
        assert!(ScanError.can_transition_to(OutcomeRecorded));
        assert!(!OutcomeRecorded.can_transition_to(OutcomeRecorded));
        assert!(!ExtractionFailed.can_transition_to(Extracting));
    }

    #[test]
    fn stats_from_outcomes_counts_each_category() {
        let mut clean = ProcessingOutcome::failed("a", "a.png", ScanEngineKind::ClamAv, 1, "x");
        clean.virus_scan = ScanResult::clean(ScanEngineKind::ClamAv, 1);
        clean.errors.clear();
        clean.success = true;
        clean.extraction = Some(ExtractionResult {
            success: true,
            text: Some("hello".to_string()),
            confidence: Some(90.0),
            language: "eng".to_string(),
            processing_time_ms: 1,
            page_count: 1,
            words: None,
            error: None,
        });

        let mut infected = clean.clone();
        infected.virus_scan.status = ScanStatus::Infected;
        infected.success = false;
        infected.extraction = None;

        let missing = ProcessingOutcome::failed("c", "", ScanEngineKind::ClamAv, 1, "not found");

        let stats = ProcessingStats::from_outcomes(&[clean, infected, missing]);
        assert_eq!(
            stats,
            ProcessingStats {
                total_files: 3,
                scanned_files: 2,
                extracted_files: 1,
                clean_files: 1,
                suspicious_files: 1,
                failed_files: 2,
            }
        );
    }
}
