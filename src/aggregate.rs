//! Cross-method aggregation and spatial deduplication.

use crate::types::{Detection, Method};

/// Merge raw candidates from all methods into the final detection list.
///
/// 1. Collapse repeats sharing the same (source, method) pair, keeping the
///    highest-confidence one in its first-seen position. Only methods that
///    emit at most one candidate per source take part: template metric
///    repeats and OCR keyword repeats. Feature clusters are distinct
///    instances by construction, so several may legitimately share one
///    source; spatial dedup arbitrates those instead.
/// 2. Drop candidates below `confidence_floor`.
/// 3. Stable-sort by descending confidence (ties keep first-seen order).
/// 4. Greedily accept, rejecting any candidate within `dedup_distance`
///    pixels of an already-accepted one, so the highest-confidence
///    representative of each on-screen instance survives.
///
/// Candidates without a location make no spatial claim and never collide.
/// Empty input yields an empty result.
pub fn aggregate(
    candidates: Vec<Detection>,
    confidence_floor: f32,
    dedup_distance: f32,
) -> Vec<Detection> {
    let mut collapsed: Vec<Detection> = Vec::new();
    for candidate in candidates {
        if candidate.method() == Method::Feature {
            collapsed.push(candidate);
            continue;
        }
        match collapsed.iter_mut().find(|existing| {
            existing.source == candidate.source && existing.method() == candidate.method()
        }) {
            Some(existing) => {
                if candidate.confidence > existing.confidence {
                    *existing = candidate;
                }
            }
            None => collapsed.push(candidate),
        }
    }

    collapsed.retain(|c| c.confidence >= confidence_floor);
    collapsed.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut accepted: Vec<Detection> = Vec::new();
    for candidate in collapsed {
        let duplicate = match candidate.location {
            Some(location) => accepted.iter().any(|existing| {
                existing
                    .location
                    .map(|accepted_location| accepted_location.distance_to(&location) < dedup_distance)
                    .unwrap_or(false)
            }),
            None => false,
        };
        if !duplicate {
            accepted.push(candidate);
        }
    }

    accepted
}
