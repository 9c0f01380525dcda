//! Per-session detection orchestration.

use std::path::Path;
use std::time::Instant;

use image::DynamicImage;
use log::info;

use crate::aggregate::aggregate;
use crate::config::DetectionConfig;
use crate::error::{DetectError, DetectResult};
use crate::exemplar::ExemplarPool;
use crate::feature_match::FeatureMatcher;
use crate::ocr::{TextHintDetector, TextRecognizer};
use crate::preprocess;
use crate::template_match::TemplateMatcher;
use crate::types::{DetectionReport, Diagnostic};

/// Detects instances of the learned character in screenshots.
///
/// Holds the immutable exemplar pool for one session. Each `detect` call is
/// a pure function of (screenshot, pool, config): no state is retained
/// across calls and repeated calls yield identical results.
pub struct CharacterDetector {
    pool: ExemplarPool,
    config: DetectionConfig,
    template: TemplateMatcher,
    feature: FeatureMatcher,
    text_hints: Option<TextHintDetector>,
}

impl CharacterDetector {
    pub fn new(pool: ExemplarPool, config: DetectionConfig) -> Self {
        let template = TemplateMatcher::new(config.confidence_floor);
        let feature = FeatureMatcher::new(config.feature.clone());
        Self {
            pool,
            config,
            template,
            feature,
            text_hints: None,
        }
    }

    /// Enable the OCR keyword heuristic with the given recognizer.
    pub fn with_text_recognizer(mut self, recognizer: Box<dyn TextRecognizer>) -> Self {
        self.text_hints = Some(TextHintDetector::new(recognizer, &self.config));
        self
    }

    pub fn pool(&self) -> &ExemplarPool {
        &self.pool
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Decode a screenshot from disk and detect. An undecodable file is a
    /// fatal error, surfaced distinctly from a report with zero detections.
    pub fn detect_path(&self, path: &Path) -> DetectResult<DetectionReport> {
        let screenshot = image::open(path).map_err(|e| DetectError::ScreenshotDecode {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(self.detect(&screenshot))
    }

    /// Detect character instances in a decoded screenshot.
    pub fn detect(&self, screenshot: &DynamicImage) -> DetectionReport {
        let start = Instant::now();
        let gray = screenshot.to_luma8();
        let binarized = preprocess::binarize(&gray);

        // Template and feature matching are independent and read-only over
        // the shared inputs.
        #[cfg(feature = "parallel")]
        let (template_out, feature_out) = rayon::join(
            || self.template.match_pool(&binarized, &self.pool),
            || self.feature.match_screenshot(&gray, &self.pool),
        );
        #[cfg(not(feature = "parallel"))]
        let (template_out, feature_out) = (
            self.template.match_pool(&binarized, &self.pool),
            self.feature.match_screenshot(&gray, &self.pool),
        );

        let (template_candidates, template_warnings) = template_out;
        let (feature_candidates, feature_warnings) = feature_out;

        let mut candidates = template_candidates;
        candidates.extend(feature_candidates);
        let mut warnings: Vec<Diagnostic> = template_warnings;
        warnings.extend(feature_warnings);

        if let Some(text_hints) = &self.text_hints {
            let (ocr_candidates, ocr_warnings) = text_hints.scan(screenshot);
            candidates.extend(ocr_candidates);
            warnings.extend(ocr_warnings);
        }

        let detections = aggregate(
            candidates,
            self.config.confidence_floor,
            self.config.dedup_distance,
        );

        let report = DetectionReport {
            detections,
            warnings,
            processing_time_ms: start.elapsed().as_millis(),
        };
        info!(
            "detection finished: {} instance(s), {} detection(s), {} warning(s), {}ms",
            report.instance_count(),
            report.detections.len(),
            report.warnings.len(),
            report.processing_time_ms
        );
        report
    }
}
