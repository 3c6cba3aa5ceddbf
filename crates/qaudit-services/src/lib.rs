//! QAudit Services Layer
//!
//! Adapters over the external engines used by evidence processing: malware
//! scanning, text extraction (OCR) and signed download URL issuance. Every adapter
//! converts engine failures into result data; none of them returns an error to
//! its caller.

pub mod download;
pub mod input;
pub mod ocr;
pub mod scanner;

pub use download::DownloadUrlService;
pub use input::FileInput;
pub use ocr::{
    search_text, OcrEngine, OcrError, OcrSession, Recognition, SimulatedOcrEngine,
    TesseractOcrEngine, TextExtractionService,
};
#[cfg(feature = "clamav")]
pub use scanner::ClamAvBackend;
pub use scanner::{
    combine_verdicts, ExtensionHeuristicScanner, ScanBackend, ScanError, ScanVerdict,
    SignatureScanner, VirusScanService,
};
