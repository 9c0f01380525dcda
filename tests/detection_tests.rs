//! End-to-end detection scenarios on synthetic screenshots.

use image::{DynamicImage, GrayImage, Luma};
use reroll_vision::{
    CharacterDetector, DetectError, DetectionConfig, ExemplarPool, Method, PixelPoint,
    TemplateMatcher, preprocess,
};

/// A corner-rich patch: a grid of squares with varied intensities on a
/// black margin wide enough that blur and threshold windows never mix
/// patch content with whatever surrounds the paste location.
fn character_patch(size: u32, seed: u32) -> GrayImage {
    let mut img = GrayImage::new(size, size);
    let margin = 12;
    let mut y = margin;
    let mut row = 0u32;
    while y + 6 < size - margin {
        let mut x = margin;
        let mut col = 0u32;
        while x + 6 < size - margin {
            let value = ((row * 37 + col * 101 + seed * 53) % 151 + 80) as u8;
            for dy in 0..6 {
                for dx in 0..6 {
                    img.put_pixel(x + dx, y + dy, Luma([value]));
                }
            }
            col += 1;
            x += 10;
        }
        row += 1;
        y += 10;
    }
    img
}

fn paste(canvas: &mut GrayImage, patch: &GrayImage, ox: u32, oy: u32) {
    for (x, y, pixel) in patch.enumerate_pixels() {
        canvas.put_pixel(ox + x, oy + y, *pixel);
    }
}

fn pool_of(patches: &[(&str, GrayImage)]) -> ExemplarPool {
    let images = patches
        .iter()
        .map(|(id, patch)| (id.to_string(), DynamicImage::ImageLuma8(patch.clone())))
        .collect();
    let (pool, _) = ExemplarPool::from_images(images, &DetectionConfig::default().feature).unwrap();
    pool
}

/// Scenario A: one unmodified exemplar pasted at (200,300) on a blank
/// background is found by template matching with near-perfect confidence.
#[test]
fn template_matching_locates_exact_paste() {
    let patch = character_patch(64, 1);
    let pool = pool_of(&[("char.png", patch.clone())]);

    let mut canvas = GrayImage::new(280, 380);
    paste(&mut canvas, &patch, 200, 300);
    let binarized = preprocess::binarize(&canvas);

    let matcher = TemplateMatcher::new(0.95);
    let detection = matcher
        .match_exemplar(&binarized, &pool.exemplars()[0])
        .expect("exact paste should match above 0.95");

    assert!(detection.confidence >= 0.95, "confidence {}", detection.confidence);
    let location = detection.location.unwrap();
    assert!(location.x.abs_diff(200) <= 2, "x was {}", location.x);
    assert!(location.y.abs_diff(300) <= 2, "y was {}", location.y);
}

#[test]
fn full_pipeline_finds_single_instance() {
    let patch = character_patch(64, 1);
    let pool = pool_of(&[("char.png", patch.clone())]);
    let detector = CharacterDetector::new(pool, DetectionConfig::default());

    let mut canvas = GrayImage::new(240, 240);
    paste(&mut canvas, &patch, 90, 120);
    let report = detector.detect(&DynamicImage::ImageLuma8(canvas));

    assert_eq!(report.instance_count(), 1);
    let best = report.best_detection().unwrap();
    let location = best.location.unwrap();
    // Template hits report the paste corner, feature hits its centroid;
    // either way the winner lies inside the pasted patch.
    assert!((90..154).contains(&location.x), "x was {}", location.x);
    assert!((120..184).contains(&location.y), "y was {}", location.y);
}

/// Two distinct exemplars pasted far apart survive deduplication as two
/// instances (the dedup distance is far smaller than their separation).
#[test]
fn two_distant_instances_are_both_counted() {
    let patch_a = character_patch(64, 1);
    let patch_b = character_patch(64, 9);
    let pool = pool_of(&[("a.png", patch_a.clone()), ("b.png", patch_b.clone())]);
    let detector = CharacterDetector::new(pool, DetectionConfig::default());

    let mut canvas = GrayImage::new(300, 300);
    paste(&mut canvas, &patch_a, 30, 30);
    paste(&mut canvas, &patch_b, 200, 200);
    let report = detector.detect(&DynamicImage::ImageLuma8(canvas));

    assert_eq!(report.instance_count(), 2);
    let locations: Vec<PixelPoint> = report
        .detections
        .iter()
        .filter_map(|d| d.location)
        .collect();
    assert!(locations[0].distance_to(&locations[1]) >= detector.config().dedup_distance);
}

/// Scenario D: a floor above anything the screenshot can score yields an
/// empty report, not an error.
#[test]
fn unreachable_floor_yields_empty_report() {
    let patch = character_patch(64, 1);
    let pool = pool_of(&[("char.png", patch)]);
    let config = DetectionConfig {
        confidence_floor: 0.995,
        ..DetectionConfig::default()
    };
    let detector = CharacterDetector::new(pool, config);

    // A screenshot with unrelated texture only: stripes binarize to a
    // different edge structure than the exemplar's square grid.
    let decoy = GrayImage::from_fn(64, 64, |_x, y| {
        Luma([if (y / 5) % 2 == 0 { 200 } else { 40 }])
    });
    let mut canvas = GrayImage::new(220, 220);
    paste(&mut canvas, &decoy, 70, 70);
    let report = detector.detect(&DynamicImage::ImageLuma8(canvas));

    assert!(report.detections.is_empty());
}

/// Scenario E: empty or missing exemplar directories fail fast with a load
/// error instead of returning a partial pool.
#[test]
fn empty_exemplar_directory_is_a_load_error() {
    let dir = std::env::temp_dir().join("reroll-vision-empty-exemplars");
    std::fs::create_dir_all(&dir).unwrap();

    let err = ExemplarPool::load_dir(&dir, &DetectionConfig::default().feature).unwrap_err();
    assert!(matches!(err, DetectError::NoUsableExemplars { .. }));

    let missing = dir.join("does-not-exist");
    let err = ExemplarPool::load_dir(&missing, &DetectionConfig::default().feature).unwrap_err();
    assert!(matches!(err, DetectError::ExemplarDirNotFound { .. }));

    std::fs::remove_dir_all(&dir).ok();
}

/// OCR keyword hits corroborate the report without claiming a location.
#[test]
fn ocr_hits_corroborate_without_location() {
    struct BannerText;
    impl reroll_vision::TextRecognizer for BannerText {
        fn recognize(
            &self,
            _screenshot: &DynamicImage,
        ) -> reroll_vision::DetectResult<String> {
            Ok("NEW SSR CHARACTER".to_string())
        }
    }

    let patch = character_patch(64, 1);
    let pool = pool_of(&[("char.png", patch.clone())]);
    let detector = CharacterDetector::new(pool, DetectionConfig::default())
        .with_text_recognizer(Box::new(BannerText));

    let mut canvas = GrayImage::new(240, 240);
    paste(&mut canvas, &patch, 90, 90);
    let report = detector.detect(&DynamicImage::ImageLuma8(canvas));

    let ocr_hits: Vec<_> = report
        .detections
        .iter()
        .filter(|d| d.method() == Method::Ocr)
        .collect();
    assert_eq!(ocr_hits.len(), 1);
    assert_eq!(ocr_hits[0].source, "SSR");
    assert!(ocr_hits[0].location.is_none());
    // The spatial instance is still found and not displaced by the hint.
    assert_eq!(report.instance_count(), 1);
}

/// Raising the confidence floor can only shrink the result set, and every
/// surviving detection already appeared at the lower floor.
#[test]
fn raising_the_floor_shrinks_the_result() {
    let patch_a = character_patch(64, 1);
    let patch_b = character_patch(64, 9);
    let pool = pool_of(&[("a.png", patch_a.clone()), ("b.png", patch_b.clone())]);

    let mut canvas = GrayImage::new(300, 300);
    paste(&mut canvas, &patch_a, 30, 30);
    paste(&mut canvas, &patch_b, 200, 200);
    let screenshot = DynamicImage::ImageLuma8(canvas);

    let low = CharacterDetector::new(pool.clone(), DetectionConfig::default()).detect(&screenshot);
    let high_config = DetectionConfig {
        confidence_floor: 0.97,
        ..DetectionConfig::default()
    };
    let high = CharacterDetector::new(pool, high_config).detect(&screenshot);

    assert!(high.detections.len() <= low.detections.len());
    for detection in &high.detections {
        assert!(low.detections.contains(detection));
    }
}
