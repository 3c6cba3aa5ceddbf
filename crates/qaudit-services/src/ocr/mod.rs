//! Text extraction (OCR) adapter.
//!
//! [`TextExtractionService`] owns at most one recognition session. The session is
//! created lazily by the injected [`OcrEngine`] on first use, reused by every
//! later call, and released by [`TextExtractionService::shutdown`].

#[cfg(feature = "enhance")]
mod enhance;
mod simulated;
mod tesseract;

pub use simulated::SimulatedOcrEngine;
pub use tesseract::TesseractOcrEngine;

use async_trait::async_trait;
use regex::RegexBuilder;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Mutex;

use qaudit_core::file_types::{is_ocr_supported_extension, is_pdf};
use qaudit_core::models::{ExtractionResult, RecognizedWord, TextSearchResult};
use qaudit_core::{ExtractionConfig, OcrBackendKind};

use crate::input::FileInput;

const MAX_SEARCH_CONTEXTS: usize = 5;
const SEARCH_CONTEXT_PADDING: usize = 5;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("OCR session has been terminated")]
    SessionTerminated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(String),
}

/// Raw output of one recognition call.
#[derive(Debug, Clone, Default)]
pub struct Recognition {
    pub text: String,
    /// Confidence score (0.0 - 100.0), if the engine reports one.
    pub confidence: Option<f32>,
    pub words: Vec<RecognizedWord>,
    pub page_count: u32,
}

/// Factory for recognition sessions.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_session(
        &self,
        config: &ExtractionConfig,
    ) -> Result<Arc<dyn OcrSession>, OcrError>;
}

/// A live recognition session (worker, process handle, model...).
#[async_trait]
pub trait OcrSession: Send + Sync {
    /// Recognize text in `data`, whose format is given by its extension.
    async fn recognize(&self, data: &[u8], ext: &str) -> Result<Recognition, OcrError>;

    /// Release the session. Later `recognize` calls fail.
    async fn terminate(&self) -> Result<(), OcrError>;
}

/// Text extraction adapter.
pub struct TextExtractionService {
    config: ExtractionConfig,
    engine: Arc<dyn OcrEngine>,
    session: Mutex<Option<Arc<dyn OcrSession>>>,
}

impl TextExtractionService {
    pub fn new(config: ExtractionConfig, engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            config,
            engine,
            session: Mutex::new(None),
        }
    }

    /// Build the adapter with the engine selected by `config.backend`.
    pub fn from_config(config: ExtractionConfig) -> Self {
        let engine: Arc<dyn OcrEngine> = match config.backend {
            OcrBackendKind::Simulated => Arc::new(SimulatedOcrEngine),
            OcrBackendKind::Tesseract => Arc::new(TesseractOcrEngine),
        };
        Self::new(config, engine)
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Whether a session is currently held.
    pub async fn is_active(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Return the shared session, creating it on first use.
    ///
    /// The lock is held across creation, so concurrent first callers share one
    /// session.
    pub async fn acquire(&self) -> Result<Arc<dyn OcrSession>, OcrError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(Arc::clone(session));
        }

        tracing::info!(
            engine = self.engine.name(),
            languages = %self.config.language_tag(),
            "Creating OCR session"
        );
        let session = self.engine.create_session(&self.config).await?;
        *guard = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Terminate and drop the session, if any. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            match session.terminate().await {
                Ok(()) => tracing::info!(engine = self.engine.name(), "OCR session terminated"),
                Err(e) => tracing::warn!(error = %e, "Failed to terminate OCR session cleanly"),
            }
        }
    }

    /// Extract text from an image or PDF. Never fails; problems are reported as
    /// unsuccessful results.
    #[tracing::instrument(skip(self, input), fields(
        engine = self.engine.name(),
        file_name = input.display_name().unwrap_or("<buffer>")
    ))]
    pub async fn extract(&self, input: &FileInput) -> ExtractionResult {
        let start = Instant::now();
        let language = self.config.language_tag();

        if !self.config.enabled {
            return ExtractionResult::failed(
                language,
                0,
                "Text extraction is disabled by configuration",
            );
        }

        let size = match input.size().await {
            Ok(size) => size,
            Err(e) => {
                return ExtractionResult::failed(
                    language,
                    elapsed_ms(start),
                    format!("Failed to read file: {}", e),
                )
            }
        };
        let max = self.config.max_file_size_bytes;
        if size > max {
            tracing::warn!(size_bytes = size, max_bytes = max, "File too large for OCR");
            return ExtractionResult::failed(
                language,
                elapsed_ms(start),
                format!(
                    "File size {} bytes exceeds maximum OCR size of {} bytes",
                    size, max
                ),
            );
        }

        let ext = match input.extension() {
            Some(ext) if is_ocr_supported_extension(&ext) => ext,
            other => {
                return ExtractionResult::failed(
                    language,
                    elapsed_ms(start),
                    format!(
                        "Unsupported file type for OCR: {}",
                        other.unwrap_or_else(|| "<none>".to_string())
                    ),
                )
            }
        };

        let data = match input.read_limited(max).await {
            Ok(Some(data)) => data.to_vec(),
            Ok(None) => {
                tracing::warn!(max_bytes = max, "File grew past the OCR limit while reading");
                return ExtractionResult::failed(
                    language,
                    elapsed_ms(start),
                    format!("File size exceeds maximum OCR size of {} bytes", max),
                );
            }
            Err(e) => {
                return ExtractionResult::failed(
                    language,
                    elapsed_ms(start),
                    format!("Failed to read file: {}", e),
                )
            }
        };

        let (data, ext) = self.prepare(data, ext).await;

        let recognition = tokio::time::timeout(self.config.timeout(), async {
            let session = self.acquire().await?;
            session.recognize(&data, &ext).await
        })
        .await;

        let processing_time_ms = elapsed_ms(start);
        match recognition {
            Ok(Ok(recognition)) => {
                let confidence = recognition
                    .confidence
                    .or_else(|| mean_confidence(&recognition.words));
                tracing::info!(
                    duration_ms = processing_time_ms,
                    words = recognition.words.len(),
                    confidence = confidence.unwrap_or_default(),
                    "Text extraction completed"
                );
                ExtractionResult {
                    success: true,
                    text: Some(recognition.text),
                    confidence,
                    language,
                    processing_time_ms,
                    page_count: recognition.page_count.max(1),
                    words: Some(recognition.words),
                    error: None,
                }
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, duration_ms = processing_time_ms, "Text extraction failed");
                ExtractionResult::failed(language, processing_time_ms, e.to_string())
            }
            Err(_) => {
                tracing::error!(
                    timeout_ms = self.config.timeout_ms,
                    "Text extraction timed out"
                );
                ExtractionResult::failed(
                    language,
                    processing_time_ms,
                    format!("OCR timeout after {} ms", self.config.timeout_ms),
                )
            }
        }
    }

    /// Optional grayscale/contrast pass for raster images. Falls back to the
    /// original bytes when the image cannot be decoded.
    async fn prepare(&self, data: Vec<u8>, ext: String) -> (Vec<u8>, String) {
        if !self.config.enhance || is_pdf(&ext) {
            return (data, ext);
        }

        #[cfg(feature = "enhance")]
        {
            let original = data.clone();
            match tokio::task::spawn_blocking(move || enhance::enhance_image(&data)).await {
                Ok(Ok(enhanced)) => (enhanced, "png".to_string()),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Image enhancement failed, using original");
                    (original, ext)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Image enhancement task failed, using original");
                    (original, ext)
                }
            }
        }

        #[cfg(not(feature = "enhance"))]
        {
            tracing::debug!("Image enhancement requested but not compiled in");
            (data, ext)
        }
    }
}

fn mean_confidence(words: &[RecognizedWord]) -> Option<f32> {
    if words.is_empty() {
        return None;
    }
    Some(words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32)
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Search previously extracted text.
///
/// Counts case-insensitive literal occurrences of `term` and returns up to five
/// snippets around the first matches. Each snippet spans the words the match
/// touches, padded with five words on either side.
pub fn search_text(result: &ExtractionResult, term: &str) -> TextSearchResult {
    let text = match result.text.as_deref() {
        Some(text) if result.success && !term.trim().is_empty() => text,
        _ => return TextSearchResult::empty(term),
    };

    let pattern = match RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) => pattern,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid search term");
            return TextSearchResult::empty(term);
        }
    };

    // (byte offset, word) for every whitespace-separated word
    let words: Vec<(usize, &str)> = text
        .split_whitespace()
        .map(|word| (word.as_ptr() as usize - text.as_ptr() as usize, word))
        .collect();
    let word_at = |offset: usize| {
        words
            .partition_point(|(start, _)| *start <= offset)
            .saturating_sub(1)
    };

    let mut occurrences = 0;
    let mut contexts = Vec::new();
    for found in pattern.find_iter(text) {
        occurrences += 1;
        if contexts.len() == MAX_SEARCH_CONTEXTS || words.is_empty() {
            continue;
        }
        let first = word_at(found.start());
        let last = word_at(found.end().saturating_sub(1)).max(first);
        let from = first.saturating_sub(SEARCH_CONTEXT_PADDING);
        let to = (last + SEARCH_CONTEXT_PADDING + 1).min(words.len());
        contexts.push(
            words[from..to]
                .iter()
                .map(|(_, word)| *word)
                .collect::<Vec<_>>()
                .join(" "),
        );
    }

    TextSearchResult {
        term: term.to_string(),
        occurrences,
        contexts,
    }
}
