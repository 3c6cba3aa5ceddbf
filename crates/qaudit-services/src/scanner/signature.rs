use async_trait::async_trait;

use qaudit_core::models::ScanEngineKind;

use super::{ScanBackend, ScanError, ScanVerdict};

/// Known test signatures and the threat label reported for each.
const DEFAULT_SIGNATURES: &[(&str, &str)] = &[
    (
        "EICAR-STANDARD-ANTIVIRUS-TEST-FILE",
        "EICAR-STANDARD-ANTIVIRUS-TEST-FILE",
    ),
    ("X5O!P%@AP[4\\PZX54(P^)7CC)7}$", "EICAR-Test-Signature"),
    ("TROJAN-TEST-SIGNATURE", "Trojan.Test.Signature"),
    ("MALWARE-TEST-SIGNATURE", "Malware.Test.Signature"),
    ("RANSOM-TEST-SIGNATURE", "Ransomware.Test.Signature"),
];

/// Content engine that matches byte signatures, case-insensitively.
///
/// Stands in for ClamAV when no daemon is configured.
#[derive(Debug, Clone)]
pub struct SignatureScanner {
    signatures: Vec<(Vec<u8>, String)>,
}

impl Default for SignatureScanner {
    fn default() -> Self {
        Self {
            signatures: DEFAULT_SIGNATURES
                .iter()
                .map(|(pattern, label)| (pattern.as_bytes().to_vec(), label.to_string()))
                .collect(),
        }
    }
}

impl SignatureScanner {
    /// Add a signature; `label` is reported as the threat name.
    pub fn with_signature(mut self, pattern: impl AsRef<[u8]>, label: impl Into<String>) -> Self {
        self.signatures
            .push((pattern.as_ref().to_vec(), label.into()));
        self
    }

    fn matches(&self, data: &[u8]) -> Vec<String> {
        let mut threats: Vec<String> = Vec::new();
        for (pattern, label) in &self.signatures {
            if pattern.is_empty() || pattern.len() > data.len() {
                continue;
            }
            let found = data
                .windows(pattern.len())
                .any(|window| window.eq_ignore_ascii_case(pattern));
            if found && !threats.contains(label) {
                threats.push(label.clone());
            }
        }
        threats
    }
}

#[async_trait]
impl ScanBackend for SignatureScanner {
    fn engine(&self) -> ScanEngineKind {
        ScanEngineKind::ClamAv
    }

    async fn scan(&self, data: &[u8], _file_name: Option<&str>) -> Result<ScanVerdict, ScanError> {
        let threats = self.matches(data);
        if threats.is_empty() {
            Ok(ScanVerdict::clean())
        } else {
            tracing::warn!(threats = ?threats, "Signature match");
            Ok(ScanVerdict::infected(threats))
        }
    }
}
