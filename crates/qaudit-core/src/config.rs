//! Configuration module
//!
//! Environment-driven configuration for the scan, extraction, object store, batch
//! and telemetry concerns of evidence processing.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::models::ScanEngineKind;

const MB: u64 = 1024 * 1024;

// Common constants
const SCAN_MAX_FILE_SIZE_MB: u64 = 100;
const SCAN_TIMEOUT_MS: u64 = 30_000;
const CLAMAV_PORT: u16 = 3310;
const OCR_MAX_FILE_SIZE_MB: u64 = 10;
const OCR_TIMEOUT_MS: u64 = 60_000;
const OCR_ENGINE_MODE: u8 = 1;
const OCR_PAGE_SEG_MODE: u8 = 3;
const SIGNED_URL_TTL_SECS: u64 = 3600;
const BATCH_DELAY_MS: u64 = 1000;

/// Virus scanning configuration
#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub enabled: bool,
    pub preferred_engine: ScanEngineKind,
    /// When scanning is disabled, report `error` instead of `clean` so files are withheld.
    pub fail_closed: bool,
    /// Live ClamAV daemon. When unset the signature simulation is used.
    pub clamav_host: Option<String>,
    pub clamav_port: u16,
    pub virustotal_api_key: Option<String>,
    pub max_file_size_bytes: u64,
    pub timeout_ms: u64,
}

impl ScanConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            preferred_engine: ScanEngineKind::ClamAv,
            fail_closed: false,
            clamav_host: None,
            clamav_port: CLAMAV_PORT,
            virustotal_api_key: None,
            max_file_size_bytes: SCAN_MAX_FILE_SIZE_MB * MB,
            timeout_ms: SCAN_TIMEOUT_MS,
        }
    }
}

/// Which OCR engine backs text extraction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OcrBackendKind {
    Simulated,
    Tesseract,
}

impl FromStr for OcrBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simulated" => Ok(OcrBackendKind::Simulated),
            "tesseract" => Ok(OcrBackendKind::Tesseract),
            _ => Err(anyhow::anyhow!("Invalid OCR backend: {}", s)),
        }
    }
}

/// Text extraction (OCR) configuration
#[derive(Clone, Debug)]
pub struct ExtractionConfig {
    pub enabled: bool,
    pub backend: OcrBackendKind,
    pub languages: Vec<String>,
    /// Tesseract `--oem` value
    pub engine_mode: u8,
    /// Tesseract `--psm` value
    pub page_seg_mode: u8,
    pub max_file_size_bytes: u64,
    pub timeout_ms: u64,
    /// Grayscale + contrast stretch raster images before recognition
    pub enhance: bool,
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Languages in engine notation, e.g. `eng+fra`.
    pub fn language_tag(&self) -> String {
        self.languages.join("+")
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: OcrBackendKind::Simulated,
            languages: vec!["eng".to_string()],
            engine_mode: OCR_ENGINE_MODE,
            page_seg_mode: OCR_PAGE_SEG_MODE,
            max_file_size_bytes: OCR_MAX_FILE_SIZE_MB * MB,
            timeout_ms: OCR_TIMEOUT_MS,
            enhance: false,
        }
    }
}

/// Object store (S3) configuration
#[derive(Clone, Debug)]
pub struct ObjectStoreConfig {
    pub enabled: bool,
    pub region: String,
    pub bucket: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub signed_url_ttl_secs: u64,
}

impl ObjectStoreConfig {
    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            region: "us-east-1".to_string(),
            bucket: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            signed_url_ttl_secs: SIGNED_URL_TTL_SECS,
        }
    }
}

/// Batch pacing configuration
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Fixed delay inserted between batch items
    pub delay_ms: u64,
    /// Directory that `storage_key` values resolve against in batch mode
    pub storage_root: PathBuf,
}

impl BatchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_ms: BATCH_DELAY_MS,
            storage_root: PathBuf::from("./storage"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    pub json_logs: bool,
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            default_filter: "qaudit=info".to_string(),
        }
    }
}

/// Application configuration for evidence processing
#[derive(Clone, Debug, Default)]
pub struct EvidenceProcessingConfig {
    pub scan: ScanConfig,
    pub extraction: ExtractionConfig,
    pub object_store: ObjectStoreConfig,
    pub batch: BatchConfig,
    pub telemetry: TelemetryConfig,
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| match v.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// Parse a numeric setting, using `default` when the value is absent or blank.
fn parse_number<T: FromStr>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, anyhow::Error> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got {:?}", key, value)),
    }
}

fn env_number<T: FromStr>(key: &str, default: T) -> Result<T, anyhow::Error> {
    parse_number(key, env::var(key).ok(), default)
}

fn megabytes_to_bytes(key: &str, mb: u64) -> Result<u64, anyhow::Error> {
    mb.checked_mul(MB)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {} MB overflows a byte count", key, mb))
}

fn env_megabytes(key: &str, default_mb: u64) -> Result<u64, anyhow::Error> {
    megabytes_to_bytes(key, env_number(key, default_mb)?)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl EvidenceProcessingConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let preferred_engine = match env::var("VIRUS_SCAN_ENGINE") {
            Ok(value) => value.parse::<ScanEngineKind>()?,
            Err(_) => ScanEngineKind::ClamAv,
        };

        let scan = ScanConfig {
            enabled: env_bool("VIRUS_SCAN_ENABLED", true),
            preferred_engine,
            fail_closed: env_bool("VIRUS_SCAN_FAIL_CLOSED", false),
            clamav_host: env::var("CLAMAV_HOST").ok().filter(|h| !h.trim().is_empty()),
            clamav_port: env::var("CLAMAV_PORT")
                .unwrap_or_else(|_| CLAMAV_PORT.to_string())
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("CLAMAV_PORT must be a valid port number"))?,
            virustotal_api_key: env::var("VIRUSTOTAL_API_KEY").ok(),
            max_file_size_bytes: env_megabytes(
                "VIRUS_SCAN_MAX_FILE_SIZE_MB",
                SCAN_MAX_FILE_SIZE_MB,
            )?,
            timeout_ms: env_number("VIRUS_SCAN_TIMEOUT_MS", SCAN_TIMEOUT_MS)?,
        };

        let backend = match env::var("OCR_BACKEND") {
            Ok(value) => value.parse::<OcrBackendKind>()?,
            Err(_) => OcrBackendKind::Simulated,
        };

        let extraction = ExtractionConfig {
            enabled: env_bool("OCR_ENABLED", true),
            backend,
            languages: parse_list(&env::var("OCR_LANGUAGES").unwrap_or_else(|_| "eng".to_string())),
            engine_mode: env_number("OCR_ENGINE_MODE", OCR_ENGINE_MODE)?,
            page_seg_mode: env_number("OCR_PAGE_SEG_MODE", OCR_PAGE_SEG_MODE)?,
            max_file_size_bytes: env_megabytes("OCR_MAX_FILE_SIZE_MB", OCR_MAX_FILE_SIZE_MB)?,
            timeout_ms: env_number("OCR_TIMEOUT_MS", OCR_TIMEOUT_MS)?,
            enhance: env_bool("OCR_ENHANCE", false),
        };

        let object_store = ObjectStoreConfig {
            enabled: env_bool("S3_ENABLED", false),
            region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .unwrap_or_else(|_| "us-east-1".to_string()),
            bucket: env::var("S3_BUCKET").ok(),
            endpoint: env::var("S3_ENDPOINT").ok(),
            access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            signed_url_ttl_secs: env_number("SIGNED_URL_TTL_SECS", SIGNED_URL_TTL_SECS)?,
        };

        let batch = BatchConfig {
            delay_ms: env_number("EVIDENCE_BATCH_DELAY_MS", BATCH_DELAY_MS)?,
            storage_root: env::var("EVIDENCE_STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./storage")),
        };

        let telemetry = TelemetryConfig {
            json_logs: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            default_filter: "qaudit=info".to_string(),
        };

        let config = EvidenceProcessingConfig {
            scan,
            extraction,
            object_store,
            batch,
            telemetry,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.scan.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "VIRUS_SCAN_MAX_FILE_SIZE_MB must be greater than zero"
            ));
        }
        if self.scan.timeout_ms == 0 {
            return Err(anyhow::anyhow!("VIRUS_SCAN_TIMEOUT_MS must be greater than zero"));
        }
        if self.extraction.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("OCR_MAX_FILE_SIZE_MB must be greater than zero"));
        }
        if self.extraction.timeout_ms == 0 {
            return Err(anyhow::anyhow!("OCR_TIMEOUT_MS must be greater than zero"));
        }
        if self.extraction.languages.is_empty() {
            return Err(anyhow::anyhow!("OCR_LANGUAGES must name at least one language"));
        }
        if self.object_store.enabled && self.object_store.bucket.is_none() {
            return Err(anyhow::anyhow!(
                "S3_BUCKET must be set when S3_ENABLED is true"
            ));
        }
        if self.object_store.signed_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!("SIGNED_URL_TTL_SECS must be greater than zero"));
        }
        Ok(())
    }
}
