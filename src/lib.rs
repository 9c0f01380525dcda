//! Character detection engine for gacha reroll automation.
//!
//! Given one screenshot and a set of reference exemplar images of a target
//! character, the engine decides how many distinct instances of the character
//! appear, where, and with what confidence. Template correlation, keypoint
//! feature matching and an OCR keyword heuristic each emit raw candidates;
//! an aggregation pass then collapses them into one deduplicated,
//! confidence-sorted result set.
//!
//! The exemplar pool is built once per session and is read-only afterwards;
//! each detection call is a pure function of (screenshot, pool, config).

pub mod aggregate;
pub mod config;
pub mod detector;
pub mod error;
pub mod exemplar;
pub mod feature_match;
pub mod ocr;
pub mod preprocess;
pub mod render;
pub mod template_match;
pub mod types;

pub use aggregate::aggregate;
pub use config::{DetectionConfig, FeatureConfig, FeatureGranularity};
pub use detector::CharacterDetector;
pub use error::{DetectError, DetectResult};
pub use exemplar::{Exemplar, ExemplarPool};
pub use feature_match::FeatureMatcher;
pub use ocr::{TextHintDetector, TextRecognizer};
pub use render::render_overlay;
pub use template_match::TemplateMatcher;
pub use types::{
    CorrelationMetric, Detection, DetectionReport, Diagnostic, Evidence, Method, PixelPoint, Stage,
};
