//! Debug overlay rendering.
//!
//! Non-authoritative visualization: a marker per located detection, its
//! sequence number, and a confidence bar, colored by method. Produces a new
//! buffer and never mutates the input.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut,
};
use imageproc::rect::Rect;

use crate::types::{Detection, Method};

const TEMPLATE_COLOR: Rgb<u8> = Rgb([0, 220, 0]);
const FEATURE_COLOR: Rgb<u8> = Rgb([0, 180, 255]);
const OCR_COLOR: Rgb<u8> = Rgb([255, 180, 0]);
const NUMBER_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const MARKER_RADIUS: i32 = 40;
const BAR_WIDTH: u32 = 40;
const BAR_HEIGHT: u32 = 5;

fn method_color(method: Method) -> Rgb<u8> {
    match method {
        Method::Template => TEMPLATE_COLOR,
        Method::Feature => FEATURE_COLOR,
        Method::Ocr => OCR_COLOR,
    }
}

/// Render detection markers over a copy of the screenshot.
///
/// Detections without a location (OCR hits) have nothing to point at and
/// are skipped. Sequence numbers follow the input order, which for an
/// aggregated report means descending confidence.
pub fn render_overlay(screenshot: &DynamicImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = screenshot.to_rgb8();

    let mut sequence = 0u32;
    for detection in detections {
        let Some(location) = detection.location else {
            continue;
        };
        sequence += 1;
        let color = method_color(detection.method());
        let center = (location.x as i32, location.y as i32);

        // Two radii fake a thicker ring.
        draw_hollow_circle_mut(&mut canvas, center, MARKER_RADIUS, color);
        draw_hollow_circle_mut(&mut canvas, center, MARKER_RADIUS - 1, color);
        draw_filled_circle_mut(&mut canvas, center, 12, color);
        draw_number(&mut canvas, center.0 - 4, center.1 - 6, sequence, NUMBER_COLOR);

        // Confidence bar to the right of the marker.
        let filled = (detection.confidence.clamp(0.0, 1.0) * BAR_WIDTH as f32) as u32;
        if filled > 0 {
            draw_filled_rect_mut(
                &mut canvas,
                Rect::at(center.0 + MARKER_RADIUS + 6, center.1 - BAR_HEIGHT as i32 / 2)
                    .of_size(filled, BAR_HEIGHT),
                color,
            );
        }
    }

    canvas
}

// Seven-segment bitmasks, segments ordered a b c d e f g.
const DIGIT_SEGMENTS: [u8; 10] = [
    0b0111111, 0b0000110, 0b1011011, 0b1001111, 0b1100110, 0b1101101, 0b1111101, 0b0000111,
    0b1111111, 0b1101111,
];

const DIGIT_WIDTH: i32 = 7;
const DIGIT_HEIGHT: i32 = 12;

fn draw_digit(canvas: &mut RgbImage, x: i32, y: i32, digit: u8, color: Rgb<u8>) {
    let segments = DIGIT_SEGMENTS[(digit % 10) as usize];
    let w = DIGIT_WIDTH as f32;
    let h = DIGIT_HEIGHT as f32;
    let half = h / 2.0;
    let (fx, fy) = (x as f32, y as f32);

    let lines: [((f32, f32), (f32, f32)); 7] = [
        ((fx, fy), (fx + w, fy)),                       // a: top
        ((fx + w, fy), (fx + w, fy + half)),            // b: top right
        ((fx + w, fy + half), (fx + w, fy + h)),        // c: bottom right
        ((fx, fy + h), (fx + w, fy + h)),               // d: bottom
        ((fx, fy + half), (fx, fy + h)),                // e: bottom left
        ((fx, fy), (fx, fy + half)),                    // f: top left
        ((fx, fy + half), (fx + w, fy + half)),         // g: middle
    ];

    for (i, (start, end)) in lines.iter().enumerate() {
        if segments & (1 << i) != 0 {
            draw_line_segment_mut(canvas, *start, *end, color);
        }
    }
}

fn draw_number(canvas: &mut RgbImage, x: i32, y: i32, number: u32, color: Rgb<u8>) {
    let digits: Vec<u8> = number
        .to_string()
        .bytes()
        .map(|b| b - b'0')
        .collect();
    for (i, digit) in digits.iter().enumerate() {
        draw_digit(canvas, x + i as i32 * (DIGIT_WIDTH + 3), y, *digit, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Evidence, PixelPoint};

    fn sample_detections() -> Vec<Detection> {
        vec![
            Detection {
                source: "a.png".into(),
                confidence: 0.92,
                location: Some(PixelPoint::new(100, 120)),
                evidence: Evidence::Feature { matched_points: 11 },
            },
            Detection {
                source: "SSR".into(),
                confidence: 0.9,
                location: None,
                evidence: Evidence::Ocr,
            },
        ]
    }

    #[test]
    fn overlay_does_not_mutate_the_input() {
        let screenshot = DynamicImage::new_rgb8(300, 300);
        let before = screenshot.to_rgb8();
        let _ = render_overlay(&screenshot, &sample_detections());
        assert_eq!(screenshot.to_rgb8(), before);
    }

    #[test]
    fn overlay_marks_located_detections() {
        let screenshot = DynamicImage::new_rgb8(300, 300);
        let overlay = render_overlay(&screenshot, &sample_detections());
        // Something was drawn near the detection, nothing far away.
        assert_ne!(*overlay.get_pixel(100 + MARKER_RADIUS as u32, 120), Rgb([0, 0, 0]));
        assert_eq!(*overlay.get_pixel(280, 280), Rgb([0, 0, 0]));
    }

    #[test]
    fn overlay_near_the_border_does_not_panic() {
        let screenshot = DynamicImage::new_rgb8(50, 50);
        let detections = vec![Detection {
            source: "a.png".into(),
            confidence: 1.0,
            location: Some(PixelPoint::new(2, 48)),
            evidence: Evidence::Template {
                metric: crate::types::CorrelationMetric::NormalizedCrossCorrelation,
            },
        }];
        let overlay = render_overlay(&screenshot, &detections);
        assert_eq!(overlay.dimensions(), (50, 50));
    }

    #[test]
    fn empty_detections_yield_unchanged_copy() {
        let screenshot = DynamicImage::new_rgb8(60, 40);
        let overlay = render_overlay(&screenshot, &[]);
        assert_eq!(overlay, screenshot.to_rgb8());
    }
}
