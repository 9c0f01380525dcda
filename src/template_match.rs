//! Correlation-based template matching of exemplars against a screenshot.
//!
//! Three metrics are scored per exemplar and the best one wins: normalized
//! cross-correlation and normalized squared difference from `imageproc`,
//! plus a zero-mean correlation coefficient computed here (`imageproc` has
//! no CCOEFF method). Cost is O(screenshot_pixels * exemplar_pixels) per
//! exemplar; callers budget accordingly.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::template_matching::{MatchTemplateMethod, match_template};
use log::{debug, warn};

use crate::exemplar::{Exemplar, ExemplarPool};
use crate::types::{CorrelationMetric, Detection, Diagnostic, Evidence, PixelPoint, Stage};

pub struct TemplateMatcher {
    threshold: f32,
}

impl TemplateMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Match every exemplar in the pool against a preprocessed screenshot.
    /// Exemplars larger than the screenshot are skipped with a diagnostic.
    pub fn match_pool(
        &self,
        screenshot: &GrayImage,
        pool: &ExemplarPool,
    ) -> (Vec<Detection>, Vec<Diagnostic>) {
        let mut detections = Vec::new();
        let mut diagnostics = Vec::new();

        for exemplar in pool.exemplars() {
            let (sw, sh) = screenshot.dimensions();
            let (tw, th) = exemplar.processed.dimensions();
            if tw > sw || th > sh {
                let message = format!(
                    "exemplar {} ({tw}x{th}) larger than screenshot ({sw}x{sh}), skipped",
                    exemplar.id
                );
                warn!("{message}");
                diagnostics.push(Diagnostic::new(Stage::Template, message));
                continue;
            }
            if let Some(detection) = self.match_exemplar(screenshot, exemplar) {
                detections.push(detection);
            }
        }

        (detections, diagnostics)
    }

    /// Match one exemplar. Returns the best-metric candidate, or `None` when
    /// its confidence falls below the threshold or the exemplar does not fit
    /// inside the screenshot.
    pub fn match_exemplar(&self, screenshot: &GrayImage, exemplar: &Exemplar) -> Option<Detection> {
        let (sw, sh) = screenshot.dimensions();
        let (tw, th) = exemplar.processed.dimensions();
        if tw > sw || th > sh || tw == 0 || th == 0 {
            return None;
        }

        let mut best: Option<(CorrelationMetric, f32, PixelPoint)> = None;

        for (metric, score) in score_all_metrics(screenshot, &exemplar.processed) {
            let replace = match &best {
                Some((_, best_confidence, _)) => score.1 > *best_confidence,
                None => true,
            };
            if replace {
                best = Some((metric, score.1, score.0));
            }
        }

        let (metric, confidence, location) = best?;
        debug!(
            "template {}: best metric {:?} confidence {:.3} at ({},{})",
            exemplar.id, metric, confidence, location.x, location.y
        );
        if confidence >= self.threshold {
            Some(Detection {
                source: exemplar.id.clone(),
                confidence,
                location: Some(location),
                evidence: Evidence::Template { metric },
            })
        } else {
            None
        }
    }
}

/// Score the template under each metric, yielding (location, confidence)
/// pairs normalized so that higher is always better.
fn score_all_metrics(
    screenshot: &GrayImage,
    template: &GrayImage,
) -> Vec<(CorrelationMetric, (PixelPoint, f32))> {
    let mut scores = Vec::with_capacity(3);

    let ncc = match_template(
        screenshot,
        template,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );
    if let Some((location, value)) = finite_peak(&ncc) {
        scores.push((
            CorrelationMetric::NormalizedCrossCorrelation,
            (location, value.clamp(0.0, 1.0)),
        ));
    }

    let nsqd = match_template(
        screenshot,
        template,
        MatchTemplateMethod::SumOfSquaredErrorsNormalized,
    );
    // Smaller difference means higher confidence.
    if let Some((location, value)) = finite_valley(&nsqd) {
        scores.push((
            CorrelationMetric::NormalizedSquaredDifference,
            (location, (1.0 - value).clamp(0.0, 1.0)),
        ));
    }

    if let Some(best) = best_correlation_coefficient(screenshot, template) {
        scores.push((CorrelationMetric::CorrelationCoefficient, best));
    }

    scores
}

/// Location of the largest finite value in a response map. Windows with zero
/// variance make the normalized metrics divide by zero; those cells are
/// skipped rather than allowed to poison the extremum.
fn finite_peak(response: &ImageBuffer<Luma<f32>, Vec<f32>>) -> Option<(PixelPoint, f32)> {
    let mut best: Option<(PixelPoint, f32)> = None;
    for (x, y, pixel) in response.enumerate_pixels() {
        let value = pixel[0];
        if !value.is_finite() {
            continue;
        }
        if best.map(|(_, b)| value > b).unwrap_or(true) {
            best = Some((PixelPoint::new(x, y), value));
        }
    }
    best
}

/// Location of the smallest finite value in a response map.
fn finite_valley(response: &ImageBuffer<Luma<f32>, Vec<f32>>) -> Option<(PixelPoint, f32)> {
    let mut best: Option<(PixelPoint, f32)> = None;
    for (x, y, pixel) in response.enumerate_pixels() {
        let value = pixel[0];
        if !value.is_finite() {
            continue;
        }
        if best.map(|(_, b)| value < b).unwrap_or(true) {
            best = Some((PixelPoint::new(x, y), value));
        }
    }
    best
}

/// Zero-mean normalized correlation coefficient, best location over the
/// full image. Returns `None` for a flat template, where the coefficient is
/// undefined. Flat screenshot windows are skipped for the same reason.
fn best_correlation_coefficient(
    image: &GrayImage,
    template: &GrayImage,
) -> Option<(PixelPoint, f32)> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw > iw || th > ih || tw == 0 || th == 0 {
        return None;
    }

    let n = (tw * th) as f64;
    let template_values: Vec<f64> = template.as_raw().iter().map(|&v| v as f64).collect();
    let template_sum: f64 = template_values.iter().sum();
    let template_mean = template_sum / n;
    let template_norm_sq: f64 = template_values
        .iter()
        .map(|v| (v - template_mean) * (v - template_mean))
        .sum();
    if template_norm_sq <= f64::EPSILON {
        return None;
    }
    let template_norm = template_norm_sq.sqrt();

    let image_raw = image.as_raw();
    let mut best: Option<(PixelPoint, f64)> = None;

    for y in 0..=(ih - th) {
        for x in 0..=(iw - tw) {
            let mut sum_i = 0.0f64;
            let mut sum_i_sq = 0.0f64;
            let mut sum_it = 0.0f64;
            for ty in 0..th {
                let image_row = ((y + ty) * iw + x) as usize;
                let template_row = (ty * tw) as usize;
                for tx in 0..tw as usize {
                    let iv = image_raw[image_row + tx] as f64;
                    let tv = template_values[template_row + tx];
                    sum_i += iv;
                    sum_i_sq += iv * iv;
                    sum_it += iv * tv;
                }
            }
            let window_norm_sq = sum_i_sq - sum_i * sum_i / n;
            if window_norm_sq <= f64::EPSILON {
                continue;
            }
            let r = (sum_it - sum_i * template_mean) / (template_norm * window_norm_sq.sqrt());
            if best.map(|(_, b)| r > b).unwrap_or(true) {
                best = Some((PixelPoint::new(x, y), r));
            }
        }
    }

    best.map(|(point, r)| (point, (r as f32).clamp(0.0, 1.0)))
}
