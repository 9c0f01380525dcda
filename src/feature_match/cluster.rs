//! Spatial clustering of matched keypoints into putative instances.

use std::collections::BTreeMap;

use crate::types::PixelPoint;

/// One surviving feature match: a screenshot-side point plus the index of
/// the exemplar whose descriptor matched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPoint {
    pub exemplar: usize,
    pub point: PixelPoint,
}

/// A spatial group of match points hypothesized to be one on-screen
/// instance of the character.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub members: Vec<MatchPoint>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Arithmetic mean of the member points.
    pub fn centroid(&self) -> PixelPoint {
        let n = self.members.len().max(1) as f64;
        let sx: f64 = self.members.iter().map(|m| m.point.x as f64).sum();
        let sy: f64 = self.members.iter().map(|m| m.point.y as f64).sum();
        PixelPoint::new((sx / n).round() as u32, (sy / n).round() as u32)
    }

    /// Exemplar contributing the most member points. Ties resolve to the
    /// lowest exemplar index.
    pub fn plurality_exemplar(&self) -> usize {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for member in &self.members {
            *counts.entry(member.exemplar).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(exemplar, _)| exemplar)
            .unwrap_or(0)
    }
}

/// Greedily cluster match points: each unclustered point seeds a cluster
/// and absorbs every other unclustered point within `radius` pixels of the
/// seed. Clusters smaller than `min_size` are dropped as incidental
/// single-point matches.
pub fn cluster_matches(matches: &[MatchPoint], radius: f32, min_size: usize) -> Vec<Cluster> {
    let mut used = vec![false; matches.len()];
    let mut clusters = Vec::new();

    for i in 0..matches.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let seed = matches[i];
        let mut members = vec![seed];

        for j in (i + 1)..matches.len() {
            if used[j] {
                continue;
            }
            if seed.point.distance_to(&matches[j].point) < radius {
                used[j] = true;
                members.push(matches[j]);
            }
        }

        if members.len() >= min_size {
            clusters.push(Cluster { members });
        }
    }

    clusters
}
