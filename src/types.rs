//! Shared detection records.

use serde::{Deserialize, Serialize};

/// A pixel position in screenshot coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: u32,
    pub y: u32,
}

impl PixelPoint {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &PixelPoint) -> f32 {
        let dx = self.x as f32 - other.x as f32;
        let dy = self.y as f32 - other.y as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Which detection method produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Template,
    Feature,
    Ocr,
}

/// Correlation metric that won the per-exemplar template comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMetric {
    NormalizedCrossCorrelation,
    CorrelationCoefficient,
    NormalizedSquaredDifference,
}

/// Method-specific evidence attached to a detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Evidence {
    Template { metric: CorrelationMetric },
    Feature { matched_points: usize },
    Ocr,
}

impl Evidence {
    pub fn method(&self) -> Method {
        match self {
            Evidence::Template { .. } => Method::Template,
            Evidence::Feature { .. } => Method::Feature,
            Evidence::Ocr => Method::Ocr,
        }
    }
}

/// One detection of the target character.
///
/// Before aggregation this is a raw single-method candidate; after
/// aggregation the surviving records represent distinct on-screen instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Exemplar identifier, or the matched keyword for OCR hits.
    pub source: String,
    /// Confidence in [0.0, 1.0].
    pub confidence: f32,
    /// Location in screenshot pixels. `None` for OCR hits, which carry no
    /// spatial information.
    pub location: Option<PixelPoint>,
    pub evidence: Evidence,
}

impl Detection {
    pub fn method(&self) -> Method {
        self.evidence.method()
    }
}

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ExemplarLoad,
    Template,
    Feature,
    Ocr,
}

/// A non-fatal warning collected during loading or detection.
///
/// Replaces the original tool's swallowed print-and-continue handling: the
/// caller gets the events back alongside the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
}

impl Diagnostic {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// The final result of one detection call.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    /// Deduplicated detections, sorted by descending confidence.
    pub detections: Vec<Detection>,
    /// Non-fatal diagnostics from all methods.
    pub warnings: Vec<Diagnostic>,
    pub processing_time_ms: u128,
}

impl DetectionReport {
    pub fn has_detections(&self) -> bool {
        !self.detections.is_empty()
    }

    pub fn best_detection(&self) -> Option<&Detection> {
        self.detections.first()
    }

    /// Number of distinct character instances with an on-screen location.
    ///
    /// OCR hits corroborate but never count as an instance on their own.
    pub fn instance_count(&self) -> usize {
        self.detections
            .iter()
            .filter(|d| d.location.is_some())
            .count()
    }
}
