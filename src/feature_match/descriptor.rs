//! Keypoint extraction and binary descriptors.
//!
//! FAST-9 corners plus a 256-bit BRIEF-style descriptor sampled from the
//! denoised grayscale. The sampling pattern is generated once from a fixed
//! seed so exemplars and screenshots always describe patches the same way,
//! and so detection stays deterministic across runs.

use image::GrayImage;
use imageproc::corners::corners_fast9;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::OnceLock;

use crate::preprocess;
use crate::types::PixelPoint;

pub const DESCRIPTOR_BYTES: usize = 32;
pub const DESCRIPTOR_BITS: usize = DESCRIPTOR_BYTES * 8;

/// 256-bit binary descriptor.
pub type Descriptor = [u8; DESCRIPTOR_BYTES];

/// Sampling patch half-width; keypoints closer than this to the image
/// border are discarded so every intensity test stays in bounds.
pub const PATCH_RADIUS: u32 = 15;

const PAIR_SEED: u64 = 0x7277_6272_6965_6631;

/// One intensity comparison inside the sampling patch, as offsets from the
/// keypoint.
#[derive(Debug, Clone, Copy)]
struct TestPair {
    ax: i32,
    ay: i32,
    bx: i32,
    by: i32,
}

fn test_pairs() -> &'static [TestPair; DESCRIPTOR_BITS] {
    static PAIRS: OnceLock<[TestPair; DESCRIPTOR_BITS]> = OnceLock::new();
    PAIRS.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(PAIR_SEED);
        let r = PATCH_RADIUS as i32;
        std::array::from_fn(|_| TestPair {
            ax: rng.gen_range(-r..=r),
            ay: rng.gen_range(-r..=r),
            bx: rng.gen_range(-r..=r),
            by: rng.gen_range(-r..=r),
        })
    })
}

/// Extract keypoints and descriptors from a grayscale buffer.
///
/// Corners are detected on the denoised image, ranked by corner score, and
/// truncated to the strongest `max_keypoints`. Returned vectors are parallel:
/// `descriptors[i]` describes the patch around `keypoints[i]`.
pub fn extract(
    gray: &GrayImage,
    fast_threshold: u8,
    max_keypoints: usize,
) -> (Vec<PixelPoint>, Vec<Descriptor>) {
    let smoothed = preprocess::denoise(gray);
    let (width, height) = smoothed.dimensions();
    if width <= 2 * PATCH_RADIUS || height <= 2 * PATCH_RADIUS {
        return (Vec::new(), Vec::new());
    }

    let mut corners = corners_fast9(&smoothed, fast_threshold);
    corners.retain(|c| {
        c.x >= PATCH_RADIUS
            && c.y >= PATCH_RADIUS
            && c.x < width - PATCH_RADIUS
            && c.y < height - PATCH_RADIUS
    });
    // Stable sort keeps scan order among equal scores, so truncation is
    // deterministic.
    corners.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    corners.truncate(max_keypoints);

    let pairs = test_pairs();
    let mut keypoints = Vec::with_capacity(corners.len());
    let mut descriptors = Vec::with_capacity(corners.len());
    for corner in &corners {
        keypoints.push(PixelPoint::new(corner.x, corner.y));
        descriptors.push(describe(&smoothed, corner.x as i32, corner.y as i32, pairs));
    }
    (keypoints, descriptors)
}

fn describe(
    smoothed: &GrayImage,
    cx: i32,
    cy: i32,
    pairs: &[TestPair; DESCRIPTOR_BITS],
) -> Descriptor {
    let mut bits: Descriptor = [0u8; DESCRIPTOR_BYTES];
    for (i, pair) in pairs.iter().enumerate() {
        let a = smoothed.get_pixel((cx + pair.ax) as u32, (cy + pair.ay) as u32)[0];
        let b = smoothed.get_pixel((cx + pair.bx) as u32, (cy + pair.by) as u32)[0];
        if a < b {
            bits[i / 8] |= 1 << (i % 8);
        }
    }
    bits
}

/// Hamming distance between two descriptors.
pub fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Grid of squares with varied intensities, a reliable corner source.
    fn textured_image(width: u32, height: u32) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        let mut row = 0u32;
        let mut y = 20;
        while y + 8 < height.saturating_sub(20) {
            let mut col = 0u32;
            let mut x = 20;
            while x + 8 < width.saturating_sub(20) {
                let value = ((row * 37 + col * 101) % 151 + 80) as u8;
                for dy in 0..8 {
                    for dx in 0..8 {
                        img.put_pixel(x + dx, y + dy, image::Luma([value]));
                    }
                }
                col += 1;
                x += 14;
            }
            row += 1;
            y += 14;
        }
        img
    }

    #[test]
    fn hamming_distance_counts_differing_bits() {
        let a: Descriptor = [0u8; DESCRIPTOR_BYTES];
        let mut b: Descriptor = [0u8; DESCRIPTOR_BYTES];
        assert_eq!(hamming(&a, &b), 0);
        b[0] = 0b1010_1010;
        b[31] = 0xFF;
        assert_eq!(hamming(&a, &b), 12);
    }

    #[test]
    fn extract_finds_corners_on_textured_image() {
        let img = textured_image(120, 120);
        let (keypoints, descriptors) = extract(&img, 20, 500);
        assert!(!keypoints.is_empty());
        assert_eq!(keypoints.len(), descriptors.len());
        // Every keypoint respects the patch border.
        for kp in &keypoints {
            assert!(kp.x >= PATCH_RADIUS && kp.x < 120 - PATCH_RADIUS);
            assert!(kp.y >= PATCH_RADIUS && kp.y < 120 - PATCH_RADIUS);
        }
    }

    #[test]
    fn extract_is_deterministic() {
        let img = textured_image(100, 100);
        let first = extract(&img, 20, 500);
        let second = extract(&img, 20, 500);
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn extract_respects_keypoint_cap() {
        let img = textured_image(140, 140);
        let (keypoints, _) = extract(&img, 10, 5);
        assert!(keypoints.len() <= 5);
    }

    #[test]
    fn tiny_images_yield_nothing() {
        let img = GrayImage::new(20, 20);
        let (keypoints, descriptors) = extract(&img, 20, 500);
        assert!(keypoints.is_empty());
        assert!(descriptors.is_empty());
    }
}
