use serde::{Deserialize, Serialize};

/// Pixel bounding box of a recognized word.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecognizedWord {
    pub text: String,
    /// Confidence score (0.0 - 100.0).
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Result of one text extraction call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Confidence score (0.0 - 100.0), if available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub language: String,
    pub processing_time_ms: u64,
    pub page_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<RecognizedWord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    /// Unsuccessful result carrying `error`.
    pub fn failed(
        language: impl Into<String>,
        processing_time_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            text: None,
            confidence: None,
            language: language.into(),
            processing_time_ms,
            page_count: 0,
            words: None,
            error: Some(error.into()),
        }
    }

    pub fn word_count(&self) -> usize {
        self.words.as_ref().map(Vec::len).unwrap_or(0)
    }
}

/// Occurrences of a term inside previously extracted text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextSearchResult {
    pub term: String,
    pub occurrences: usize,
    pub contexts: Vec<String>,
}

impl TextSearchResult {
    pub fn empty(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            occurrences: 0,
            contexts: Vec::new(),
        }
    }
}
