//! Configuration for detection operations.

use serde::{Deserialize, Serialize};

/// Default rarity/star keywords scanned for in OCR output.
pub const DEFAULT_OCR_KEYWORDS: [&str; 7] = ["SSR", "SR", "UR", "R", "5★", "4★", "3★"];

/// Whether feature matching runs against one pooled character model or
/// exemplar-by-exemplar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureGranularity {
    /// All exemplar descriptors form one model; cluster sources are
    /// attributed to the exemplar contributing the most matches.
    Pooled,
    /// The matching pipeline runs once per exemplar, with the minimum-match
    /// floor applied per exemplar.
    PerExemplar,
}

/// Tunables for the keypoint-feature matching path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub granularity: FeatureGranularity,
    /// FAST-9 corner threshold.
    pub fast_threshold: u8,
    /// Keep only the strongest N corners per image.
    pub max_keypoints: usize,
    /// Lowe's ratio: keep a match only if best < ratio * second_best.
    pub lowe_ratio: f32,
    /// Below this many surviving matches the method reports nothing.
    pub min_matches: usize,
    /// Points within this radius of a cluster seed join the cluster.
    pub cluster_radius: f32,
    /// Minimum spatial support for a cluster to become a detection.
    pub min_cluster_size: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            granularity: FeatureGranularity::Pooled,
            fast_threshold: 20,
            max_keypoints: 500,
            lowe_ratio: 0.7,
            min_matches: 10,
            cluster_radius: 100.0,
            min_cluster_size: 5,
        }
    }
}

/// Configuration for one detection session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Minimum confidence for a candidate to survive aggregation. Also the
    /// emit threshold for template matching.
    pub confidence_floor: f32,
    /// Detections closer than this many pixels collapse into one instance.
    pub dedup_distance: f32,
    pub feature: FeatureConfig,
    /// Keywords the text-hint detector scans for.
    pub ocr_keywords: Vec<String>,
    /// Confidence assigned to every keyword hit. The value is a heuristic,
    /// not a calibrated precision; OCR hits carry no location and can only
    /// corroborate, never displace, a spatial detection.
    pub ocr_confidence: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.7,
            dedup_distance: 80.0,
            feature: FeatureConfig::default(),
            ocr_keywords: DEFAULT_OCR_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            ocr_confidence: 0.9,
        }
    }
}

impl DetectionConfig {
    /// Preset for confirming a single expected pull: higher floor, wide
    /// dedup radius.
    pub fn strict() -> Self {
        Self {
            confidence_floor: 0.85,
            dedup_distance: 150.0,
            ..Self::default()
        }
    }

    /// Preset for counting instances on a crowded results screen.
    pub fn permissive() -> Self {
        Self {
            confidence_floor: 0.6,
            dedup_distance: 60.0,
            ..Self::default()
        }
    }
}
