use qaudit_core::models::EvidenceStage;

/// Records the stages one evidence item passes through.
pub(crate) struct StageTrace<'a> {
    evidence_id: &'a str,
    stages: Vec<EvidenceStage>,
}

impl<'a> StageTrace<'a> {
    pub(crate) fn new(evidence_id: &'a str) -> Self {
        Self {
            evidence_id,
            stages: vec![EvidenceStage::Pending],
        }
    }

    pub(crate) fn current(&self) -> EvidenceStage {
        self.stages
            .last()
            .copied()
            .unwrap_or(EvidenceStage::Pending)
    }

    pub(crate) fn advance(&mut self, next: EvidenceStage) {
        let current = self.current();
        if !current.can_transition_to(next) {
            tracing::warn!(
                evidence_id = %self.evidence_id,
                from = %current,
                to = %next,
                "Unexpected evidence stage transition"
            );
        }
        tracing::debug!(evidence_id = %self.evidence_id, stage = %next, "Evidence stage");
        self.stages.push(next);
    }

    pub(crate) fn finish(mut self) -> Vec<EvidenceStage> {
        self.advance(EvidenceStage::OutcomeRecorded);
        self.stages
    }
}
