//! OCR keyword hints.
//!
//! A low-precision, location-agnostic signal: the screenshot text is scanned
//! for rarity/star markers. Hits corroborate the spatial methods but never
//! count as an instance on their own. The engine depends only on the
//! [`TextRecognizer`] trait; the tesseract-backed implementation is feature
//! gated so the core crate stays free of external binaries.

use image::DynamicImage;
use log::warn;

use crate::config::DetectionConfig;
use crate::error::DetectResult;
use crate::types::{Detection, Diagnostic, Evidence, Stage};

/// Extracts plain text from a screenshot.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, screenshot: &DynamicImage) -> DetectResult<String>;
}

/// Scans recognized text for a fixed keyword set.
pub struct TextHintDetector {
    recognizer: Box<dyn TextRecognizer>,
    keywords: Vec<String>,
    confidence: f32,
}

impl TextHintDetector {
    pub fn new(recognizer: Box<dyn TextRecognizer>, config: &DetectionConfig) -> Self {
        Self {
            recognizer,
            keywords: config.ocr_keywords.clone(),
            confidence: config.ocr_confidence,
        }
    }

    /// Run OCR and scan the output. Recognizer failure is a diagnostic, not
    /// an error; the other methods still produce a result.
    pub fn scan(&self, screenshot: &DynamicImage) -> (Vec<Detection>, Vec<Diagnostic>) {
        match self.recognizer.recognize(screenshot) {
            Ok(text) => (self.scan_text(&text), Vec::new()),
            Err(e) => {
                let message = format!("text recognition failed: {e}");
                warn!("{message}");
                (Vec::new(), vec![Diagnostic::new(Stage::Ocr, message)])
            }
        }
    }

    /// Scan already-extracted text. Comparison is whole-token and
    /// case-insensitive, so the single-letter rarity marker `R` does not
    /// fire on every word containing the letter. One hit per keyword
    /// regardless of how often it appears.
    pub fn scan_text(&self, text: &str) -> Vec<Detection> {
        let tokens: Vec<String> = tokenize(text).map(|t| t.to_lowercase()).collect();
        self.keywords
            .iter()
            .filter(|keyword| {
                let keyword = keyword.to_lowercase();
                tokens.iter().any(|token| *token == keyword)
            })
            .map(|keyword| Detection {
                source: keyword.clone(),
                confidence: self.confidence,
                location: None,
                evidence: Evidence::Ocr,
            })
            .collect()
    }
}

/// Split on anything that is not alphanumeric or a star glyph, so `5★`
/// survives as one token.
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric() && c != '★')
        .filter(|t| !t.is_empty())
}

/// Tesseract-backed recognizer, one `tesseract` process per call with
/// `--oem 3 --psm 6`. The screenshot is staged as a temporary PNG so the
/// handoff does not depend on in-memory buffer layouts.
#[cfg(feature = "ocr")]
pub struct TesseractRecognizer {
    args: rusty_tesseract::Args,
}

#[cfg(feature = "ocr")]
impl TesseractRecognizer {
    pub fn new() -> Self {
        Self {
            args: rusty_tesseract::Args {
                psm: Some(6),
                oem: Some(3),
                ..rusty_tesseract::Args::default()
            },
        }
    }

    fn recognition_error(detail: impl ToString) -> crate::error::DetectError {
        crate::error::DetectError::TextRecognition {
            detail: detail.to_string(),
        }
    }
}

#[cfg(feature = "ocr")]
impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "ocr")]
impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, screenshot: &DynamicImage) -> DetectResult<String> {
        use std::sync::atomic::{AtomicU64, Ordering};

        // Process id alone is not unique across concurrent detectors in one
        // process; a counter keeps staging files from clobbering each other.
        static STAGE_COUNTER: AtomicU64 = AtomicU64::new(0);
        let stamp = STAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "reroll-vision-ocr-{}-{stamp}.png",
            std::process::id()
        ));
        screenshot
            .save(&path)
            .map_err(Self::recognition_error)?;
        let result = rusty_tesseract::Image::from_path(&path)
            .and_then(|image| rusty_tesseract::image_to_string(&image, &self.args))
            .map_err(Self::recognition_error);
        std::fs::remove_file(&path).ok();
        result
    }
}
