//! Keypoint-feature matching between the exemplar pool and a screenshot.
//!
//! Descriptors from the pool are matched to screenshot descriptors with a
//! 2-nearest-neighbor search and Lowe's ratio test, then the surviving
//! screenshot-side points are clustered into candidate instances.

pub mod cluster;
pub mod descriptor;

use image::GrayImage;
use log::debug;

use crate::config::{FeatureConfig, FeatureGranularity};
use crate::exemplar::ExemplarPool;
use crate::types::{Detection, Diagnostic, Evidence, PixelPoint};
use cluster::{MatchPoint, cluster_matches};
use descriptor::{Descriptor, hamming};

/// Confidence is capped below 1.0: feature matching is inherently noisier
/// than template correlation.
const CONFIDENCE_CAP: f32 = 0.95;

pub struct FeatureMatcher {
    config: FeatureConfig,
}

impl FeatureMatcher {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Match a screenshot against the pool and return candidate detections.
    ///
    /// Yielding no candidates is the normal negative result when evidence is
    /// insufficient; it is never an error.
    pub fn match_screenshot(
        &self,
        screenshot_gray: &GrayImage,
        pool: &ExemplarPool,
    ) -> (Vec<Detection>, Vec<Diagnostic>) {
        let diagnostics = Vec::new();

        let (scene_points, scene_descriptors) = descriptor::extract(
            screenshot_gray,
            self.config.fast_threshold,
            self.config.max_keypoints,
        );
        if scene_descriptors.len() < 2 {
            debug!(
                "feature matching: only {} screenshot keypoint(s), skipping",
                scene_descriptors.len()
            );
            return (Vec::new(), diagnostics);
        }

        let detections = match self.config.granularity {
            FeatureGranularity::Pooled => {
                let good = good_matches(
                    pool.pooled_descriptors()
                        .iter()
                        .map(|p| (p.exemplar, &p.bits)),
                    &scene_descriptors,
                    &scene_points,
                    self.config.lowe_ratio,
                );
                self.candidates_from_matches(&good, pool)
            }
            FeatureGranularity::PerExemplar => {
                let mut all = Vec::new();
                for (index, exemplar) in pool.exemplars().iter().enumerate() {
                    let good = good_matches(
                        exemplar.descriptors.iter().map(|d| (index, d)),
                        &scene_descriptors,
                        &scene_points,
                        self.config.lowe_ratio,
                    );
                    all.extend(self.candidates_from_matches(&good, pool));
                }
                all
            }
        };

        (detections, diagnostics)
    }

    fn candidates_from_matches(
        &self,
        good: &[MatchPoint],
        pool: &ExemplarPool,
    ) -> Vec<Detection> {
        if good.len() < self.config.min_matches {
            debug!(
                "feature matching: {} good match(es) below floor of {}",
                good.len(),
                self.config.min_matches
            );
            return Vec::new();
        }

        cluster_matches(good, self.config.cluster_radius, self.config.min_cluster_size)
            .into_iter()
            .map(|cluster| {
                let source = pool.exemplars()[cluster.plurality_exemplar()].id.clone();
                Detection {
                    source,
                    confidence: cluster_confidence(cluster.len()),
                    location: Some(cluster.centroid()),
                    evidence: Evidence::Feature {
                        matched_points: cluster.len(),
                    },
                }
            })
            .collect()
    }
}

/// Saturating linear confidence rewarding denser clusters.
fn cluster_confidence(cluster_size: usize) -> f32 {
    (cluster_size as f32 / 20.0 + 0.5).min(CONFIDENCE_CAP)
}

/// 2-NN matching with Lowe's ratio test: a pool descriptor matches only if
/// its nearest screenshot descriptor is clearly closer than the runner-up.
fn good_matches<'a>(
    pool_descriptors: impl Iterator<Item = (usize, &'a Descriptor)>,
    scene_descriptors: &[Descriptor],
    scene_points: &[PixelPoint],
    ratio: f32,
) -> Vec<MatchPoint> {
    let mut good = Vec::new();
    for (exemplar, query) in pool_descriptors {
        let mut best = u32::MAX;
        let mut second = u32::MAX;
        let mut best_index = 0usize;
        for (index, candidate) in scene_descriptors.iter().enumerate() {
            let distance = hamming(query, candidate);
            if distance < best {
                second = best;
                best = distance;
                best_index = index;
            } else if distance < second {
                second = distance;
            }
        }
        if (best as f32) < ratio * (second as f32) {
            good.push(MatchPoint {
                exemplar,
                point: scene_points[best_index],
            });
        }
    }
    good
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(fill: u8) -> Descriptor {
        [fill; descriptor::DESCRIPTOR_BYTES]
    }

    #[test]
    fn ratio_test_keeps_unambiguous_matches() {
        // Scene: one descriptor identical to the query, one far away.
        let scene = vec![desc(0b1111_0000), desc(0)];
        let points = vec![PixelPoint::new(50, 60), PixelPoint::new(400, 400)];
        let query = desc(0b1111_0000);

        let good = good_matches([(0usize, &query)].into_iter(), &scene, &points, 0.7);
        assert_eq!(good.len(), 1);
        assert_eq!(good[0].point, PixelPoint::new(50, 60));
    }

    #[test]
    fn ratio_test_rejects_ambiguous_matches() {
        // Both scene descriptors are equally distant from the query.
        let scene = vec![desc(0b0000_0001), desc(0b0000_0010)];
        let points = vec![PixelPoint::new(1, 1), PixelPoint::new(2, 2)];
        let query = desc(0);

        let good = good_matches([(0usize, &query)].into_iter(), &scene, &points, 0.7);
        assert!(good.is_empty());
    }

    #[test]
    fn identical_best_and_second_are_rejected() {
        // Exact duplicate instances produce best == second == 0, which the
        // strict inequality rejects.
        let scene = vec![desc(7), desc(7)];
        let points = vec![PixelPoint::new(1, 1), PixelPoint::new(2, 2)];
        let query = desc(7);

        let good = good_matches([(0usize, &query)].into_iter(), &scene, &points, 0.7);
        assert!(good.is_empty());
    }

    #[test]
    fn cluster_confidence_saturates() {
        assert!((cluster_confidence(5) - 0.75).abs() < 1e-6);
        assert!((cluster_confidence(8) - 0.9).abs() < 1e-6);
        assert_eq!(cluster_confidence(20), CONFIDENCE_CAP);
        assert_eq!(cluster_confidence(100), CONFIDENCE_CAP);
    }
}
