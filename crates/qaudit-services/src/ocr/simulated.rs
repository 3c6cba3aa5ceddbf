use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use qaudit_core::models::{BoundingBox, RecognizedWord};
use qaudit_core::ExtractionConfig;

use super::{OcrEngine, OcrError, OcrSession, Recognition};

const MIN_WORD_LEN: usize = 3;
const WORDS_PER_LINE: usize = 10;
const CHAR_WIDTH: u32 = 12;
const LINE_HEIGHT: u32 = 40;
const WORD_GAP: u32 = 8;

/// Deterministic engine that needs no external binaries.
///
/// Printable ASCII runs in the input are reported as words on a synthetic
/// page layout, which makes text files renamed to image extensions useful
/// fixtures.
#[derive(Debug, Clone, Default)]
pub struct SimulatedOcrEngine;

#[async_trait]
impl OcrEngine for SimulatedOcrEngine {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn create_session(
        &self,
        _config: &ExtractionConfig,
    ) -> Result<Arc<dyn OcrSession>, OcrError> {
        Ok(Arc::new(SimulatedSession::default()))
    }
}

#[derive(Debug, Default)]
struct SimulatedSession {
    terminated: AtomicBool,
}

/// Split `data` into runs of printable ASCII (alphanumerics and punctuation).
fn printable_runs(data: &[u8]) -> Vec<String> {
    data.split(|b| !b.is_ascii_graphic())
        .filter(|run| run.len() >= MIN_WORD_LEN)
        .map(|run| String::from_utf8_lossy(run).into_owned())
        .collect()
}

/// Stable pseudo-confidence in 60..=99 derived from the word itself.
fn word_confidence(word: &str) -> f32 {
    let sum: u32 = word.bytes().map(u32::from).sum();
    60.0 + (sum % 40) as f32
}

fn layout(words: Vec<String>) -> Vec<RecognizedWord> {
    let mut laid_out = Vec::with_capacity(words.len());
    let mut x = 0u32;
    for (i, text) in words.into_iter().enumerate() {
        if i % WORDS_PER_LINE == 0 {
            x = 0;
        }
        let line = (i / WORDS_PER_LINE) as u32;
        let width = text.len() as u32 * CHAR_WIDTH;
        let bbox = BoundingBox {
            x0: x,
            y0: line * LINE_HEIGHT,
            x1: x + width,
            y1: line * LINE_HEIGHT + LINE_HEIGHT - WORD_GAP,
        };
        x += width + WORD_GAP;
        laid_out.push(RecognizedWord {
            confidence: word_confidence(&text),
            text,
            bbox,
        });
    }
    laid_out
}

#[async_trait]
impl OcrSession for SimulatedSession {
    async fn recognize(&self, data: &[u8], _ext: &str) -> Result<Recognition, OcrError> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(OcrError::SessionTerminated);
        }

        let words = layout(printable_runs(data));
        let text = words
            .chunks(WORDS_PER_LINE)
            .map(|line| {
                line.iter()
                    .map(|w| w.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Recognition {
            text,
            confidence: None,
            words,
            page_count: 1,
        })
    }

    async fn terminate(&self) -> Result<(), OcrError> {
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}
