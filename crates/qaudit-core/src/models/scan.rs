use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Classification of a file by a malware-detection backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Clean,
    Infected,
    Suspected,
    Error,
}

impl ScanStatus {
    pub fn is_clean(&self) -> bool {
        matches!(self, ScanStatus::Clean)
    }
}

impl Display for ScanStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ScanStatus::Clean => write!(f, "clean"),
            ScanStatus::Infected => write!(f, "infected"),
            ScanStatus::Suspected => write!(f, "suspected"),
            ScanStatus::Error => write!(f, "error"),
        }
    }
}

/// Scan engine selection.
///
/// `ClamAv` is the content-signature engine, `VirusTotal` the reputation /
/// extension heuristic engine, and `Hybrid` runs both and merges the verdicts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScanEngineKind {
    #[serde(rename = "clamav")]
    ClamAv,
    #[serde(rename = "virustotal")]
    VirusTotal,
    Hybrid,
}

impl Display for ScanEngineKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ScanEngineKind::ClamAv => write!(f, "clamav"),
            ScanEngineKind::VirusTotal => write!(f, "virustotal"),
            ScanEngineKind::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for ScanEngineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clamav" => Ok(ScanEngineKind::ClamAv),
            "virustotal" => Ok(ScanEngineKind::VirusTotal),
            "hybrid" => Ok(ScanEngineKind::Hybrid),
            _ => Err(anyhow::anyhow!("Invalid scan engine: {}", s)),
        }
    }
}

/// Result of a single scan invocation. Created fresh per call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanResult {
    pub status: ScanStatus,
    pub engine: ScanEngineKind,
    pub scan_time_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub threats: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<String>,
}

impl ScanResult {
    pub fn clean(engine: ScanEngineKind, scan_time_ms: u64) -> Self {
        Self {
            status: ScanStatus::Clean,
            engine,
            scan_time_ms,
            threats: Vec::new(),
            details: None,
            scan_id: None,
        }
    }

    pub fn error(engine: ScanEngineKind, scan_time_ms: u64, details: impl Into<String>) -> Self {
        Self {
            status: ScanStatus::Error,
            engine,
            scan_time_ms,
            threats: Vec::new(),
            details: Some(details.into()),
            scan_id: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_kind_round_trips_through_str() {
        for kind in [
            ScanEngineKind::ClamAv,
            ScanEngineKind::VirusTotal,
            ScanEngineKind::Hybrid,
        ] {
            assert_eq!(kind.to_string().parse::<ScanEngineKind>().unwrap(), kind);
        }
        assert!("norton".parse::<ScanEngineKind>().is_err());
        assert_eq!(
            "HYBRID".parse::<ScanEngineKind>().unwrap(),
            ScanEngineKind::Hybrid
        );
    }

    #[test]
    fn scan_result_serializes_lowercase_and_skips_empty_threats() {
        let result = ScanResult::clean(ScanEngineKind::ClamAv, 4);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "clean");
        assert_eq!(json["engine"], "clamav");
        assert!(json.get("threats").is_none());
        assert!(json.get("details").is_none());
    }
}
