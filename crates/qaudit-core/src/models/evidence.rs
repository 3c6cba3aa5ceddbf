use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::ScanStatus;

/// Evidence file metadata as persisted by the host application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceRecord {
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_ext: String,
    pub storage_key: String,
    pub file_size: u64,
}

/// Scan status as stored on the host's evidence record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceScanStatus {
    Pending,
    Clean,
    Suspected,
    Blocked,
}

impl From<ScanStatus> for EvidenceScanStatus {
    /// Infected files are blocked; failed scans go back to pending so the host
    /// can schedule another attempt.
    fn from(status: ScanStatus) -> Self {
        match status {
            ScanStatus::Clean => EvidenceScanStatus::Clean,
            ScanStatus::Infected => EvidenceScanStatus::Blocked,
            ScanStatus::Suspected => EvidenceScanStatus::Suspected,
            ScanStatus::Error => EvidenceScanStatus::Pending,
        }
    }
}

impl Display for EvidenceScanStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            EvidenceScanStatus::Pending => write!(f, "pending"),
            EvidenceScanStatus::Clean => write!(f, "clean"),
            EvidenceScanStatus::Suspected => write!(f, "suspected"),
            EvidenceScanStatus::Blocked => write!(f, "blocked"),
        }
    }
}

impl FromStr for EvidenceScanStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EvidenceScanStatus::Pending),
            "clean" => Ok(EvidenceScanStatus::Clean),
            "suspected" => Ok(EvidenceScanStatus::Suspected),
            "blocked" => Ok(EvidenceScanStatus::Blocked),
            _ => Err(anyhow::anyhow!("Invalid evidence scan status: {}", s)),
        }
    }
}
