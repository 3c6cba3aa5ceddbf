//! Shared fixtures for orchestrator tests: in-memory repository, signer and
//! misbehaving engines.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use qaudit_core::models::{
    EvidenceRecord, EvidenceScanStatus, ExtractionResult, ScanEngineKind,
};
use qaudit_core::{BatchConfig, EvidenceRepository, ExtractionConfig, ObjectStoreConfig, ScanConfig};
use qaudit_processing::EvidenceProcessor;
use qaudit_services::{
    DownloadUrlService, OcrEngine, OcrError, OcrSession, Recognition, ScanBackend, ScanError,
    ScanVerdict, SimulatedOcrEngine, TextExtractionService, VirusScanService,
};
use qaudit_storage::{StorageError, StorageResult, UrlSigner};

/// In-memory evidence repository recording every write.
#[derive(Default, Clone)]
pub struct MockEvidenceRepository {
    pub records: Arc<Mutex<HashMap<String, EvidenceRecord>>>,
    pub status_updates: Arc<Mutex<Vec<(String, EvidenceScanStatus)>>>,
    pub stored_extractions: Arc<Mutex<Vec<(String, ExtractionResult)>>>,
    pub fail_lookups: bool,
    pub fail_writes: bool,
}

impl MockEvidenceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: EvidenceRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    pub fn statuses(&self) -> Vec<(String, EvidenceScanStatus)> {
        self.status_updates.lock().unwrap().clone()
    }

    pub fn stored_count(&self) -> usize {
        self.stored_extractions.lock().unwrap().len()
    }
}

#[async_trait]
impl EvidenceRepository for MockEvidenceRepository {
    async fn get_evidence_record(&self, evidence_id: &str) -> Result<Option<EvidenceRecord>> {
        if self.fail_lookups {
            return Err(anyhow!("connection reset by peer"));
        }
        Ok(self.records.lock().unwrap().get(evidence_id).cloned())
    }

    async fn update_evidence_scan_status(
        &self,
        evidence_id: &str,
        status: EvidenceScanStatus,
    ) -> Result<()> {
        self.status_updates
            .lock()
            .unwrap()
            .push((evidence_id.to_string(), status));
        if self.fail_writes {
            return Err(anyhow!("write rejected"));
        }
        Ok(())
    }

    async fn store_extraction_result(
        &self,
        evidence_id: &str,
        extraction: &ExtractionResult,
    ) -> Result<()> {
        self.stored_extractions
            .lock()
            .unwrap()
            .push((evidence_id.to_string(), extraction.clone()));
        if self.fail_writes {
            return Err(anyhow!("write rejected"));
        }
        Ok(())
    }
}

/// Signer producing fake URLs, or failing on demand.
#[derive(Default)]
pub struct StubSigner {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

#[async_trait]
impl UrlSigner for StubSigner {
    async fn presign_get(
        &self,
        storage_key: &str,
        _content_disposition: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.calls.lock().unwrap().push(storage_key.to_string());
        if self.fail {
            return Err(StorageError::PresignFailed("credentials expired".to_string()));
        }
        Ok(format!(
            "https://evidence.example/{}?X-Amz-Expires={}",
            storage_key,
            expires_in.as_secs()
        ))
    }

    fn backend_name(&self) -> &'static str {
        "stub"
    }
}

/// OCR engine whose sessions always fail.
pub struct FailingOcrEngine;

struct FailingSession;

#[async_trait]
impl OcrEngine for FailingOcrEngine {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn create_session(
        &self,
        _config: &ExtractionConfig,
    ) -> Result<Arc<dyn OcrSession>, OcrError> {
        Ok(Arc::new(FailingSession))
    }
}

#[async_trait]
impl OcrSession for FailingSession {
    async fn recognize(&self, _data: &[u8], _ext: &str) -> Result<Recognition, OcrError> {
        Err(OcrError::OcrFailed("recognition worker crashed".to_string()))
    }

    async fn terminate(&self) -> Result<(), OcrError> {
        Ok(())
    }
}

/// Scan backend with a scripted misbehaviour.
pub enum BrokenBackend {
    Fails,
    Panics,
}

#[async_trait]
impl ScanBackend for BrokenBackend {
    fn engine(&self) -> ScanEngineKind {
        ScanEngineKind::ClamAv
    }

    async fn scan(&self, _data: &[u8], _file_name: Option<&str>) -> Result<ScanVerdict, ScanError> {
        match self {
            BrokenBackend::Fails => Err(ScanError::Unavailable("daemon offline".to_string())),
            BrokenBackend::Panics => panic!("scanner state corrupted"),
        }
    }
}

pub fn record(id: &str, file_name: &str, mime_type: &str, storage_key: &str) -> EvidenceRecord {
    let file_ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();
    EvidenceRecord {
        id: id.to_string(),
        file_name: file_name.to_string(),
        mime_type: mime_type.to_string(),
        file_ext,
        storage_key: storage_key.to_string(),
        file_size: 0,
    }
}

pub fn write_fixture(dir: &Path, relative: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

pub fn default_scanner() -> Arc<VirusScanService> {
    Arc::new(VirusScanService::from_config(ScanConfig::default()))
}

pub fn broken_scanner(backend: BrokenBackend) -> Arc<VirusScanService> {
    let backend: Arc<dyn ScanBackend> = Arc::new(backend);
    Arc::new(VirusScanService::new(
        ScanConfig::default(),
        Arc::clone(&backend),
        backend,
    ))
}

pub fn simulated_extractor() -> Arc<TextExtractionService> {
    Arc::new(TextExtractionService::new(
        ExtractionConfig::default(),
        Arc::new(SimulatedOcrEngine),
    ))
}

pub fn failing_extractor() -> Arc<TextExtractionService> {
    Arc::new(TextExtractionService::new(
        ExtractionConfig::default(),
        Arc::new(FailingOcrEngine),
    ))
}

pub fn downloads(signer: Arc<StubSigner>) -> Arc<DownloadUrlService> {
    let config = ObjectStoreConfig {
        enabled: true,
        bucket: Some("qaudit-evidence".to_string()),
        ..Default::default()
    };
    Arc::new(DownloadUrlService::new(config, signer))
}

pub fn batch_config(storage_root: &Path, delay_ms: u64) -> BatchConfig {
    BatchConfig {
        delay_ms,
        storage_root: storage_root.to_path_buf(),
    }
}

pub fn processor(
    repository: &MockEvidenceRepository,
    scanner: Arc<VirusScanService>,
    extractor: Arc<TextExtractionService>,
    downloads: Arc<DownloadUrlService>,
    batch: BatchConfig,
) -> EvidenceProcessor {
    EvidenceProcessor::new(
        Arc::new(repository.clone()),
        scanner,
        extractor,
        downloads,
        batch,
    )
}
