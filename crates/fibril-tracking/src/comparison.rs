//! Scoring a tracing against a reference tracing of the same image.
//!
//! Used to tune tracer parameters: a hand-drawn (or previously accepted)
//! feature set is the reference, a fresh tracing is the candidate, and the
//! share of features that pair up gives precision and recall.

use fibril_core::geometry::resample_unit;
use fibril_core::{Coordinate, Feature, FeatureId, FeatureSet, FibrilError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Candidates examined per reference feature by [`match_by_line`], nearest centroid first.
pub const CLOSEST_LIMIT: usize = 10;

/// A reference feature paired with a candidate feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterMatch {
    pub reference: FeatureId,
    pub candidate: FeatureId,
    /// Centroid distance for [`match_by_center`], mean line distance for [`match_by_line`].
    pub distance: f32,
}

fn check_distance(max_distance: f32) -> Result<()> {
    if max_distance.is_nan() || max_distance <= 0.0 {
        return Err(FibrilError::InvalidParameter(format!(
            "comparison max_distance must be positive, got {}",
            max_distance
        )));
    }
    Ok(())
}

/// Pair features by centroid distance.
///
/// Reference features are visited in id order and each takes the nearest
/// unpaired candidate within `max_distance`; equal distances go to the lower
/// candidate id. An infinite `max_distance` disables the cutoff.
pub fn match_by_center(reference: &FeatureSet, candidates: &FeatureSet, max_distance: f32) -> Result<Vec<CenterMatch>> {
    check_distance(max_distance)?;
    let centroids: Vec<(FeatureId, Coordinate)> = candidates.iter().map(|(id, f)| (id, f.centroid())).collect();
    let mut taken = vec![false; centroids.len()];
    let mut matches = Vec::new();

    for (ref_id, feature) in reference.iter() {
        let center = feature.centroid();
        let mut best: Option<(usize, f32)> = None;
        for (i, &(_, c)) in centroids.iter().enumerate() {
            if taken[i] {
                continue;
            }
            let d = center.distance(c);
            if d <= max_distance && best.map_or(true, |(_, b)| d < b) {
                best = Some((i, d));
            }
        }
        if let Some((i, distance)) = best {
            taken[i] = true;
            matches.push(CenterMatch {
                reference: ref_id,
                candidate: centroids[i].0,
                distance,
            });
        }
    }
    debug!(matched = matches.len(), reference = reference.len(), "Matched tracings by center");
    Ok(matches)
}

/// Mean distance from the reference line to the candidate line.
///
/// Both lines are resampled at unit spacing; every reference sample
/// contributes its distance to the nearest candidate sample. Identical
/// lines score 0.
pub fn mean_line_distance(reference: &Feature, candidate: &Feature) -> f32 {
    let ref_points = resample_unit(&reference.coords_vec());
    let cand_points = resample_unit(&candidate.coords_vec());
    let total: f32 = ref_points
        .iter()
        .map(|p| cand_points.iter().map(|c| p.distance(*c)).fold(f32::INFINITY, f32::min))
        .sum();
    total / ref_points.len() as f32
}

/// Pair features by [`mean_line_distance`].
///
/// Each reference feature, in id order, considers the [`CLOSEST_LIMIT`]
/// unpaired candidates with the nearest centroids and takes the one with the
/// smallest mean line distance, if that is within `max_distance`.
pub fn match_by_line(reference: &FeatureSet, candidates: &FeatureSet, max_distance: f32) -> Result<Vec<CenterMatch>> {
    check_distance(max_distance)?;
    let pool: Vec<(FeatureId, &Feature, Coordinate)> =
        candidates.iter().map(|(id, f)| (id, f, f.centroid())).collect();
    let mut taken = vec![false; pool.len()];
    let mut matches = Vec::new();

    for (ref_id, feature) in reference.iter() {
        let center = feature.centroid();
        let mut nearest: Vec<(f32, usize)> = (0..pool.len())
            .filter(|&i| !taken[i])
            .map(|i| (center.distance(pool[i].2), i))
            .collect();
        nearest.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        nearest.truncate(CLOSEST_LIMIT);

        let mut best: Option<(usize, f32)> = None;
        for (_, i) in nearest {
            let d = mean_line_distance(feature, pool[i].1);
            if d <= max_distance && best.map_or(true, |(_, b)| d < b) {
                best = Some((i, d));
            }
        }
        if let Some((i, distance)) = best {
            taken[i] = true;
            matches.push(CenterMatch {
                reference: ref_id,
                candidate: pool[i].0,
                distance,
            });
        }
    }
    debug!(matched = matches.len(), reference = reference.len(), "Matched tracings by line");
    Ok(matches)
}

/// Agreement between a candidate tracing and its reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonScore {
    pub matched: usize,
    pub reference_total: usize,
    pub candidate_total: usize,
    /// Share of candidate features that found a reference partner.
    pub precision: f32,
    /// Share of reference features that found a candidate partner.
    pub recall: f32,
}

impl ComparisonScore {
    pub fn new(matches: &[CenterMatch], reference: &FeatureSet, candidates: &FeatureSet) -> Self {
        let matched = matches.len();
        let ratio = |total: usize| if total == 0 { 0.0 } else { matched as f32 / total as f32 };
        Self {
            matched,
            reference_total: reference.len(),
            candidate_total: candidates.len(),
            precision: ratio(candidates.len()),
            recall: ratio(reference.len()),
        }
    }
}
