use async_trait::async_trait;
use uuid::Uuid;

use qaudit_core::file_types::extension_of;
use qaudit_core::models::ScanEngineKind;

use super::{ScanBackend, ScanError, ScanVerdict};

/// Executable and script extensions treated as suspicious.
const SUSPICIOUS_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "com", "scr", "pif", "vbs", "vbe", "js", "jse", "wsf", "wsh", "msi",
    "ps1", "jar", "dll", "hta", "cpl", "reg", "lnk",
];

/// Reputation engine judging files by their extension.
///
/// Stands in for a VirusTotal lookup. Every verdict carries a `vt-` prefixed
/// scan id.
#[derive(Debug, Clone, Default)]
pub struct ExtensionHeuristicScanner;

impl ExtensionHeuristicScanner {
    pub fn is_suspicious_extension(ext: &str) -> bool {
        SUSPICIOUS_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

#[async_trait]
impl ScanBackend for ExtensionHeuristicScanner {
    fn engine(&self) -> ScanEngineKind {
        ScanEngineKind::VirusTotal
    }

    async fn scan(&self, _data: &[u8], file_name: Option<&str>) -> Result<ScanVerdict, ScanError> {
        let scan_id = format!("vt-{}", Uuid::new_v4());
        let ext = file_name.and_then(extension_of);

        let mut verdict = match ext {
            Some(ext) if Self::is_suspicious_extension(&ext) => ScanVerdict::suspected(
                vec![format!("Suspicious.Extension.{}", ext)],
                format!("File extension .{} is commonly used by executables", ext),
            ),
            _ => ScanVerdict::clean(),
        };
        verdict.scan_id = Some(scan_id);
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qaudit_core::models::ScanStatus;

    #[tokio::test]
    async fn executable_extension_is_suspected() {
        let verdict = ExtensionHeuristicScanner
            .scan(b"MZ", Some("Setup.EXE"))
            .await
            .unwrap();
        assert_eq!(verdict.status, ScanStatus::Suspected);
        assert_eq!(verdict.threats, vec!["Suspicious.Extension.exe".to_string()]);
        assert!(verdict.scan_id.unwrap().starts_with("vt-"));
    }

    #[tokio::test]
    async fn documents_and_unnamed_buffers_are_clean() {
        for name in [Some("policy.pdf"), Some("README"), None] {
            let verdict = ExtensionHeuristicScanner.scan(b"data", name).await.unwrap();
            assert_eq!(verdict.status, ScanStatus::Clean, "{:?}", name);
            assert!(verdict.scan_id.is_some());
        }
    }
}
