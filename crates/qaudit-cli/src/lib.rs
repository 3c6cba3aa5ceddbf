//! Library half of the `qaudit` CLI: a transient evidence repository for local
//! files and JSON output helpers.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use qaudit_core::file_types::{extension_of, mime_from_extension};
use qaudit_core::models::{EvidenceRecord, EvidenceScanStatus, ExtractionResult};
use qaudit_core::EvidenceRepository;

pub fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// In-memory repository holding records for files named on the command line.
///
/// Status updates and extraction results are kept so they can be reported
/// after the run.
#[derive(Default, Clone)]
pub struct LocalEvidenceRepository {
    records: Arc<Mutex<HashMap<String, EvidenceRecord>>>,
    statuses: Arc<Mutex<HashMap<String, EvidenceScanStatus>>>,
}

impl LocalEvidenceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `files` as evidence stored under `root`, returning their ids in
    /// order. Every file must live inside `root`.
    pub fn register_files(&self, root: &Path, files: &[PathBuf]) -> Result<Vec<String>> {
        let root = root
            .canonicalize()
            .with_context(|| format!("Storage root {} not found", root.display()))?;
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("Evidence registry lock poisoned"))?;

        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            let path = file
                .canonicalize()
                .with_context(|| format!("File {} not found", file.display()))?;
            let storage_key = match path.strip_prefix(&root) {
                Ok(relative) => relative.to_string_lossy().into_owned(),
                Err(_) => bail!(
                    "{} is outside the storage root {}",
                    path.display(),
                    root.display()
                ),
            };
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| storage_key.clone());
            let file_ext = extension_of(&file_name).unwrap_or_default();
            let file_size = std::fs::metadata(&path)
                .with_context(|| format!("Failed to stat {}", path.display()))?
                .len();

            let id = Uuid::new_v4().to_string();
            records.insert(
                id.clone(),
                EvidenceRecord {
                    id: id.clone(),
                    mime_type: mime_from_extension(&file_ext).to_string(),
                    file_name,
                    file_ext,
                    storage_key,
                    file_size,
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    pub fn status_of(&self, evidence_id: &str) -> Option<EvidenceScanStatus> {
        self.statuses
            .lock()
            .ok()
            .and_then(|s| s.get(evidence_id).copied())
    }
}

#[async_trait]
impl EvidenceRepository for LocalEvidenceRepository {
    async fn get_evidence_record(&self, evidence_id: &str) -> Result<Option<EvidenceRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("Evidence registry lock poisoned"))?;
        Ok(records.get(evidence_id).cloned())
    }

    async fn update_evidence_scan_status(
        &self,
        evidence_id: &str,
        status: EvidenceScanStatus,
    ) -> Result<()> {
        tracing::debug!(evidence_id = %evidence_id, status = %status, "Scan status updated");
        self.statuses
            .lock()
            .map_err(|_| anyhow::anyhow!("Evidence registry lock poisoned"))?
            .insert(evidence_id.to_string(), status);
        Ok(())
    }

    async fn store_extraction_result(
        &self,
        evidence_id: &str,
        extraction: &ExtractionResult,
    ) -> Result<()> {
        tracing::debug!(
            evidence_id = %evidence_id,
            words = extraction.word_count(),
            "Extraction result received"
        );
        Ok(())
    }
}
