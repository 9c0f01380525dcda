//! Exemplar loading and the pooled character model.
//!
//! The pool is built once per detection session by a pure function and is
//! read-only afterwards; rebuilding it must not overlap with in-flight
//! matches, which the ownership model already guarantees for callers that
//! share it behind `&`.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage};
use log::{info, warn};

use crate::config::FeatureConfig;
use crate::error::{DetectError, DetectResult};
use crate::feature_match::descriptor::{self, Descriptor};
use crate::preprocess;
use crate::types::{Diagnostic, PixelPoint, Stage};

/// File extensions accepted when scanning an exemplar directory.
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tiff"];

/// One reference image of the target character, immutable once built.
#[derive(Debug, Clone)]
pub struct Exemplar {
    /// Stable identifier: the source file name.
    pub id: String,
    /// Grayscale conversion of the source image.
    pub gray: GrayImage,
    /// Blurred and binarized buffer used for template matching.
    pub processed: GrayImage,
    /// Keypoints in exemplar coordinates, parallel to `descriptors`.
    pub keypoints: Vec<PixelPoint>,
    pub descriptors: Vec<Descriptor>,
}

/// A pooled descriptor tagged with the exemplar it came from, so pooled
/// clusters can be attributed back to a source image.
#[derive(Debug, Clone, Copy)]
pub struct PooledDescriptor {
    pub exemplar: usize,
    pub bits: Descriptor,
}

/// The learned character model: all exemplars plus the union of their
/// descriptors. Invariant: never empty.
#[derive(Debug, Clone)]
pub struct ExemplarPool {
    exemplars: Vec<Exemplar>,
    pooled: Vec<PooledDescriptor>,
}

impl ExemplarPool {
    /// Build a pool from already-decoded images, each paired with its
    /// identifier. Images too small or too uniform to yield keypoints are
    /// kept (template matching still uses them) with a warning.
    pub fn from_images(
        images: Vec<(String, DynamicImage)>,
        feature: &FeatureConfig,
    ) -> DetectResult<(Self, Vec<Diagnostic>)> {
        let attempted = images.len();
        let mut diagnostics = Vec::new();
        let mut exemplars = Vec::new();

        for (id, image) in images {
            let gray = image.to_luma8();
            let processed = preprocess::binarize(&gray);
            let (keypoints, descriptors) =
                descriptor::extract(&gray, feature.fast_threshold, feature.max_keypoints);
            if descriptors.is_empty() {
                let message = format!("exemplar {id}: no keypoints extracted");
                warn!("{message}");
                diagnostics.push(Diagnostic::new(Stage::ExemplarLoad, message));
            } else {
                info!("exemplar {id}: {} keypoint(s)", keypoints.len());
            }
            exemplars.push(Exemplar {
                id,
                gray,
                processed,
                keypoints,
                descriptors,
            });
        }

        if exemplars.is_empty() {
            return Err(DetectError::NoUsableExemplars { attempted });
        }

        let pooled = exemplars
            .iter()
            .enumerate()
            .flat_map(|(index, exemplar)| {
                exemplar.descriptors.iter().map(move |bits| PooledDescriptor {
                    exemplar: index,
                    bits: *bits,
                })
            })
            .collect();

        Ok((Self { exemplars, pooled }, diagnostics))
    }

    /// Load exemplars from explicit paths. Unreadable files are skipped with
    /// a warning; zero usable files is fatal.
    pub fn load(paths: &[PathBuf], feature: &FeatureConfig) -> DetectResult<(Self, Vec<Diagnostic>)> {
        let attempted = paths.len();
        let mut skipped = Vec::new();
        let mut images = Vec::new();

        for path in paths {
            match image::open(path) {
                Ok(image) => {
                    let id = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                        .to_string();
                    images.push((id, image));
                }
                Err(e) => {
                    let message = format!("skipping exemplar {path:?}: {e}");
                    warn!("{message}");
                    skipped.push(Diagnostic::new(Stage::ExemplarLoad, message));
                }
            }
        }

        if images.is_empty() {
            return Err(DetectError::NoUsableExemplars { attempted });
        }

        let (pool, mut diagnostics) = Self::from_images(images, feature)?;
        // Keep skip events ahead of extraction events, in path order.
        skipped.append(&mut diagnostics);
        Ok((pool, skipped))
    }

    /// Load every image file from a directory, sorted by file name for
    /// deterministic exemplar indices.
    pub fn load_dir(dir: &Path, feature: &FeatureConfig) -> DetectResult<(Self, Vec<Diagnostic>)> {
        if !dir.exists() {
            return Err(DetectError::ExemplarDirNotFound {
                path: dir.to_path_buf(),
            });
        }

        let entries = std::fs::read_dir(dir).map_err(|e| DetectError::ExemplarDirUnreadable {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(DetectError::NoUsableExemplars { attempted: 0 });
        }

        Self::load(&paths, feature)
    }

    pub fn exemplars(&self) -> &[Exemplar] {
        &self.exemplars
    }

    pub fn pooled_descriptors(&self) -> &[PooledDescriptor] {
        &self.pooled
    }

    pub fn len(&self) -> usize {
        self.exemplars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exemplars.is_empty()
    }

    /// Total pooled feature count across all exemplars.
    pub fn feature_count(&self) -> usize {
        self.pooled.len()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
