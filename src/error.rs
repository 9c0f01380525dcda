use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for detection operations.
pub type DetectResult<T> = Result<T, DetectError>;

/// The error type for fatal detection failures.
///
/// Per-exemplar and per-method failures are not represented here: they are
/// isolated, logged, and surfaced as [`crate::types::Diagnostic`] warnings.
/// Only whole-pipeline preconditions are fatal.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("exemplar directory not found: {path:?}")]
    ExemplarDirNotFound { path: PathBuf },

    #[error("failed to read exemplar directory {path:?}: {source}")]
    ExemplarDirUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no usable exemplar images ({attempted} file(s) attempted, all skipped)")]
    NoUsableExemplars { attempted: usize },

    #[error("failed to decode screenshot {path:?}: {source}")]
    ScreenshotDecode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("text recognition failed: {detail}")]
    TextRecognition { detail: String },
}

impl DetectError {
    /// True when the error means "bad input" rather than "nothing found".
    ///
    /// An empty [`crate::types::DetectionReport`] is never an error; this
    /// distinguishes the two operational meanings for callers that retry.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            DetectError::ScreenshotDecode { .. }
                | DetectError::ExemplarDirNotFound { .. }
                | DetectError::NoUsableExemplars { .. }
        )
    }
}
