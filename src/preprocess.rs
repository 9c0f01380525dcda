//! Shared preprocessing for exemplars and screenshots.
//!
//! Template matching runs on binarized buffers so that correlation compares
//! shape rather than absolute brightness; both sides of the comparison must
//! go through the identical pipeline.

use image::GrayImage;
use imageproc::contrast::adaptive_threshold;
use imageproc::filter::gaussian_blur_f32;

/// Sigma of the denoising blur, the 3x3-kernel equivalent.
pub const BLUR_SIGMA: f32 = 0.8;

/// Radius of the adaptive threshold window (11x11 pixels).
pub const THRESHOLD_BLOCK_RADIUS: u32 = 5;

/// Denoise a grayscale buffer without binarizing it. Keypoint extraction
/// runs on this, since binarization destroys the gradients FAST relies on.
pub fn denoise(gray: &GrayImage) -> GrayImage {
    gaussian_blur_f32(gray, BLUR_SIGMA)
}

/// Full pipeline for template matching: blur, then adaptive threshold.
pub fn binarize(gray: &GrayImage) -> GrayImage {
    adaptive_threshold(&denoise(gray), THRESHOLD_BLOCK_RADIUS)
}
