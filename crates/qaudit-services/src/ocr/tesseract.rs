//! Tesseract OCR engine.
//!
//! Drives the `tesseract` CLI (and `pdftoppm` for PDFs) as child processes and
//! parses its TSV output for words, confidences and bounding boxes.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::process::Command;

use qaudit_core::file_types::is_pdf;
use qaudit_core::models::{BoundingBox, RecognizedWord};
use qaudit_core::ExtractionConfig;

use super::{OcrEngine, OcrError, OcrSession, Recognition};

/// TSV level of word rows.
const TSV_WORD_LEVEL: &str = "5";
const PDF_RENDER_DPI: &str = "300";

#[derive(Debug, Clone, Default)]
pub struct TesseractOcrEngine;

#[async_trait]
impl OcrEngine for TesseractOcrEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn create_session(
        &self,
        config: &ExtractionConfig,
    ) -> Result<Arc<dyn OcrSession>, OcrError> {
        let output = Command::new("tesseract")
            .arg("--version")
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ),
                _ => OcrError::Io(e),
            })?;
        if !output.status.success() {
            return Err(OcrError::BackendNotAvailable(
                "tesseract --version failed".to_string(),
            ));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(
            version = version.lines().next().unwrap_or("unknown"),
            "Tesseract available"
        );

        Ok(Arc::new(TesseractSession {
            languages: config.language_tag(),
            engine_mode: config.engine_mode,
            page_seg_mode: config.page_seg_mode,
            terminated: AtomicBool::new(false),
        }))
    }
}

struct TesseractSession {
    languages: String,
    engine_mode: u8,
    page_seg_mode: u8,
    terminated: AtomicBool,
}

impl TesseractSession {
    async fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.languages])
            .args(["--oem", &self.engine_mode.to_string()])
            .args(["--psm", &self.page_seg_mode.to_string()])
            .arg("tsv")
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(OcrError::BackendNotAvailable(
                "tesseract not found (install tesseract-ocr)".to_string(),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

/// Render the first page of a PDF to PNG.
async fn pdf_first_page_to_image(pdf_path: &Path, output_dir: &Path) -> Result<PathBuf, OcrError> {
    let output_prefix = output_dir.join("page");
    let status = Command::new("pdftoppm")
        .args(["-png", "-r", PDF_RENDER_DPI, "-f", "1", "-l", "1", "-singlefile"])
        .arg(pdf_path)
        .arg(&output_prefix)
        .kill_on_drop(true)
        .status()
        .await;

    match status {
        Ok(s) if s.success() => {
            let image = output_dir.join("page.png");
            if image.exists() {
                Ok(image)
            } else {
                Err(OcrError::OcrFailed("No image generated for page 1".to_string()))
            }
        }
        Ok(_) => Err(OcrError::OcrFailed(
            "pdftoppm failed to convert PDF page".to_string(),
        )),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(OcrError::BackendNotAvailable(
            "pdftoppm not found (install poppler-utils)".to_string(),
        )),
        Err(e) => Err(OcrError::Io(e)),
    }
}

/// Parse `tesseract ... tsv` output.
///
/// Columns: level page_num block_num par_num line_num word_num left top width
/// height conf text. Only word rows with a non-negative confidence are kept;
/// text is rebuilt line by line.
fn parse_tsv(tsv: &str) -> Recognition {
    let mut words = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut current_line: Option<(&str, &str, &str, &str)> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != TSV_WORD_LEVEL {
            continue;
        }
        let text = cols[11].trim();
        let confidence: f32 = cols[10].parse().unwrap_or(-1.0);
        if text.is_empty() || confidence < 0.0 {
            continue;
        }
        let num = |i: usize| cols[i].parse::<u32>().unwrap_or(0);
        let (left, top, width, height) = (num(6), num(7), num(8), num(9));

        let line_key = (cols[1], cols[2], cols[3], cols[4]);
        if current_line != Some(line_key) {
            lines.push(String::new());
            current_line = Some(line_key);
        }
        if let Some(line) = lines.last_mut() {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(text);
        }

        words.push(RecognizedWord {
            text: text.to_string(),
            confidence,
            bbox: BoundingBox {
                x0: left,
                y0: top,
                x1: left + width,
                y1: top + height,
            },
        });
    }

    Recognition {
        text: lines.join("\n"),
        confidence: None,
        words,
        page_count: 1,
    }
}

#[async_trait]
impl OcrSession for TesseractSession {
    async fn recognize(&self, data: &[u8], ext: &str) -> Result<Recognition, OcrError> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(OcrError::SessionTerminated);
        }

        let temp_dir = TempDir::new()?;
        let input_path = temp_dir.path().join(format!("input.{}", ext));
        tokio::fs::write(&input_path, data).await?;

        let image_path = if is_pdf(ext) {
            pdf_first_page_to_image(&input_path, temp_dir.path()).await?
        } else {
            input_path
        };

        let tsv = self.run_tesseract(&image_path).await?;
        Ok(parse_tsv(&tsv))
    }

    async fn terminate(&self) -> Result<(), OcrError> {
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t
4\t1\t1\t1\t1\t0\t10\t10\t300\t30\t-1\t
5\t1\t1\t1\t1\t1\t10\t10\t120\t30\t96.5\tQuarterly
5\t1\t1\t1\t1\t2\t140\t10\t100\t30\t91.0\treview
5\t1\t1\t1\t2\t1\t10\t50\t90\t30\t88.0\tSigned
5\t1\t1\t1\t2\t2\t110\t50\t10\t30\t-1\t
";

    #[test]
    fn parses_word_rows_and_lines() {
        let recognition = parse_tsv(SAMPLE_TSV);
        assert_eq!(recognition.text, "Quarterly review\nSigned");
        assert_eq!(recognition.words.len(), 3);
        assert_eq!(
            recognition.words[1].bbox,
            BoundingBox { x0: 140, y0: 10, x1: 240, y1: 40 }
        );
        assert_eq!(recognition.words[0].confidence, 96.5);
    }

    #[test]
    fn empty_output_yields_no_words() {
        let recognition = parse_tsv("");
        assert!(recognition.words.is_empty());
        assert!(recognition.text.is_empty());
    }

    #[tokio::test]
    async fn terminated_session_refuses_work() {
        let session = TesseractSession {
            languages: "eng".to_string(),
            engine_mode: 1,
            page_seg_mode: 3,
            terminated: AtomicBool::new(true),
        };
        assert!(matches!(
            session.recognize(b"", "png").await,
            Err(OcrError::SessionTerminated)
        ));
    }
}
