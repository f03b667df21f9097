//! Nearest-coordinate matching between the feature sets of two frames.
//!
//! Every coordinate of the source frame claims the nearest still-unclaimed
//! coordinate of the target frame within `max_distance`. Each feature then
//! votes for the target feature most of its coordinates matched, and a pair of
//! features is confirmed only when the votes of both passes agree.

use std::collections::{BTreeMap, HashMap};

use fibril_core::{Coordinate, FeatureId, FeatureSet, FibrilError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Match of one source coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Feature owning the claimed target coordinate.
    pub feature: FeatureId,
    /// Euclidean distance to that coordinate.
    pub distance: f32,
}

/// Per-coordinate matches of every source feature, in trace order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchTable {
    records: BTreeMap<FeatureId, Vec<Option<MatchRecord>>>,
}

impl MatchTable {
    pub fn get(&self, feature: FeatureId) -> Option<&[Option<MatchRecord>]> {
        self.records.get(&feature).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &[Option<MatchRecord>])> {
        self.records.iter().map(|(id, r)| (*id, r.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Majority target of each source feature.
    ///
    /// Unmatched coordinates vote `None`; ties go to the value seen first.
    pub fn votes(&self) -> BTreeMap<FeatureId, Option<FeatureId>> {
        self.records
            .iter()
            .map(|(id, records)| (*id, mode(records.iter().map(|r| r.map(|m| m.feature)))))
            .collect()
    }
}

fn mode(values: impl Iterator<Item = Option<FeatureId>>) -> Option<FeatureId> {
    let mut counts: SmallVec<[(Option<FeatureId>, usize); 8]> = SmallVec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    let mut best: Option<(Option<FeatureId>, usize)> = None;
    for &(value, n) in &counts {
        if best.map_or(true, |(_, b)| n > b) {
            best = Some((value, n));
        }
    }
    best.and_then(|(value, _)| value)
}

/// Both matching passes between frame A (earlier) and frame B (later).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameMatch {
    /// A's coordinates matched into B.
    pub forward: MatchTable,
    /// B's coordinates matched into A.
    pub backward: MatchTable,
}

impl FrameMatch {
    /// Mutually agreed `(feature in A, feature in B)` pairs.
    pub fn confirmed_pairs(&self) -> Vec<(FeatureId, FeatureId)> {
        mutual_pairs(&self.forward.votes(), &self.backward.votes())
    }
}

/// Pairs `(a, b)` where A's feature `a` votes for `b` and B's feature `b` votes for `a`.
pub fn mutual_pairs(
    a_votes: &BTreeMap<FeatureId, Option<FeatureId>>,
    b_votes: &BTreeMap<FeatureId, Option<FeatureId>>,
) -> Vec<(FeatureId, FeatureId)> {
    a_votes
        .iter()
        .filter_map(|(&a, &vote)| {
            let b = vote?;
            (b_votes.get(&b) == Some(&Some(a))).then_some((a, b))
        })
        .collect()
}

/// Match `frame_a` against `frame_b` in both directions.
///
/// Candidates must lie inside the `max_distance` box around the source
/// coordinate and also within Euclidean `distance <= max_distance`; the box
/// alone would admit corner points up to `max_distance * sqrt(2)` away.
pub fn match_frames(frame_a: &FeatureSet, frame_b: &FeatureSet, max_distance: f32) -> Result<FrameMatch> {
    if !max_distance.is_finite() || max_distance <= 0.0 {
        return Err(FibrilError::InvalidParameter(format!(
            "max_distance must be finite and positive, got {}",
            max_distance
        )));
    }
    Ok(FrameMatch {
        forward: match_pass(frame_a, frame_b, max_distance),
        backward: match_pass(frame_b, frame_a, max_distance),
    })
}

/// One greedy pass over the source coordinates with a fresh target pool.
fn match_pass(source: &FeatureSet, target: &FeatureSet, max_distance: f32) -> MatchTable {
    let mut pool = TargetPool::new(target, max_distance);
    let records = source
        .iter()
        .map(|(id, feature)| {
            let matches = feature.coordinates().map(|c| pool.claim_nearest(c)).collect();
            (id, matches)
        })
        .collect();
    MatchTable { records }
}

/// Target coordinates bucketed in a uniform grid of cell size `max_distance`.
struct TargetPool {
    max_distance: f32,
    points: Vec<(FeatureId, Coordinate)>,
    claimed: Vec<bool>,
    grid: HashMap<(i64, i64), Vec<usize>>,
}

impl TargetPool {
    fn new(target: &FeatureSet, max_distance: f32) -> Self {
        let points: Vec<(FeatureId, Coordinate)> = target
            .iter()
            .flat_map(|(id, f)| f.coordinates().map(move |c| (id, c)))
            .collect();
        let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (index, (_, c)) in points.iter().enumerate() {
            grid.entry(cell_of(*c, max_distance)).or_default().push(index);
        }
        Self {
            max_distance,
            claimed: vec![false; points.len()],
            points,
            grid,
        }
    }

    fn claim_nearest(&mut self, query: Coordinate) -> Option<MatchRecord> {
        let (index, distance) = self.claim(query)?;
        Some(MatchRecord {
            feature: self.points[index].0,
            distance,
        })
    }

    /// Claim the nearest unclaimed coordinate, earliest on ties.
    fn claim(&mut self, query: Coordinate) -> Option<(usize, f32)> {
        let (cx, cy) = cell_of(query, self.max_distance);
        let mut best: Option<(f32, usize)> = None;
        for gy in cy - 1..=cy + 1 {
            for gx in cx - 1..=cx + 1 {
                let Some(bucket) = self.grid.get(&(gx, gy)) else {
                    continue;
                };
                for &index in bucket {
                    if self.claimed[index] {
                        continue;
                    }
                    let delta = self.points[index].1 - query;
                    if delta.x.abs() >= self.max_distance || delta.y.abs() >= self.max_distance {
                        continue;
                    }
                    let distance = delta.length();
                    if distance > self.max_distance {
                        continue;
                    }
                    let better = match best {
                        None => true,
                        Some((d, i)) => distance < d || (distance == d && index < i),
                    };
                    if better {
                        best = Some((distance, index));
                    }
                }
            }
        }
        let (distance, index) = best?;
        self.claimed[index] = true;
        Some((index, distance))
    }
}

#[inline]
fn cell_of(c: Coordinate, cell: f32) -> (i64, i64) {
    ((c.x / cell).floor() as i64, (c.y / cell).floor() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fibril_core::Feature;

    fn vertical(x: f32, y0: usize, n: usize) -> Feature {
        Feature::new((y0..y0 + n).map(|y| Coordinate::new(x, y as f32)).collect()).unwrap()
    }

    #[test]
    fn test_translated_feature_matches_mutually() {
        let a: FeatureSet = vec![vertical(10.0, 0, 10)].into_iter().collect();
        let b: FeatureSet = vec![vertical(12.0, 0, 10)].into_iter().collect();
        let m = match_frames(&a, &b, 20.0).unwrap();
        let records = m.forward.get(0).unwrap();
        assert!(records.iter().all(|r| {
            let r = r.unwrap();
            r.feature == 0 && (r.distance - 2.0).abs() < 1e-5
        }));
        assert_eq!(m.confirmed_pairs(), vec![(0, 0)]);
    }

    #[test]
    fn test_far_feature_unmatched() {
        let a: FeatureSet = vec![vertical(10.0, 0, 5)].into_iter().collect();
        let b: FeatureSet = vec![vertical(40.0, 0, 5)].into_iter().collect();
        let m = match_frames(&a, &b, 20.0).unwrap();
        assert!(m.forward.get(0).unwrap().iter().all(Option::is_none));
        assert_eq!(m.forward.votes().get(&0), Some(&None));
        assert!(m.confirmed_pairs().is_empty());
    }

    #[test]
    fn test_box_filter_is_strict() {
        let a: FeatureSet = vec![Feature::new(vec![Coordinate::new(0.0, 0.0)]).unwrap()].into_iter().collect();
        let b: FeatureSet = vec![Feature::new(vec![Coordinate::new(5.0, 0.0)]).unwrap()].into_iter().collect();
        let m = match_frames(&a, &b, 5.0).unwrap();
        assert_eq!(m.forward.get(0).unwrap()[0], None);
    }

    #[test]
    fn test_claimed_targets_are_removed() {
        // two source coordinates compete for one target coordinate
        let a: FeatureSet = vec![Feature::new(vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0)]).unwrap()]
            .into_iter()
            .collect();
        let b: FeatureSet = vec![Feature::new(vec![Coordinate::new(0.5, 0.0)]).unwrap()].into_iter().collect();
        let m = match_frames(&a, &b, 3.0).unwrap();
        let records = m.forward.get(0).unwrap();
        assert!(records[0].is_some());
        assert!(records[1].is_none());
    }

    #[test]
    fn test_equal_distance_prefers_earliest_target() {
        let a: FeatureSet = vec![Feature::new(vec![Coordinate::new(5.0, 5.0)]).unwrap()].into_iter().collect();
        let b: FeatureSet = vec![
            Feature::new(vec![Coordinate::new(7.0, 5.0)]).unwrap(),
            Feature::new(vec![Coordinate::new(3.0, 5.0)]).unwrap(),
        ]
        .into_iter()
        .collect();
        let m = match_frames(&a, &b, 10.0).unwrap();
        assert_eq!(m.forward.get(0).unwrap()[0].unwrap().feature, 0);
    }

    #[test]
    fn test_mode_counts_unmatched_and_breaks_ties_by_first_seen() {
        assert_eq!(mode([None, None, Some(1)].into_iter()), None);
        assert_eq!(mode([Some(2), Some(1), Some(1), Some(2)].into_iter()), Some(2));
        assert_eq!(mode([Some(3), None, Some(3)].into_iter()), Some(3));
    }

    #[test]
    fn test_mutual_pairs_require_agreement() {
        let a_votes: BTreeMap<FeatureId, Option<FeatureId>> = [(0, Some(1)), (1, Some(0)), (2, None)].into();
        let b_votes: BTreeMap<FeatureId, Option<FeatureId>> = [(0, Some(5)), (1, Some(0))].into();
        assert_eq!(mutual_pairs(&a_votes, &b_votes), vec![(0, 1)]);
    }

    #[test]
    fn test_invalid_distance() {
        let set = FeatureSet::new();
        assert!(match_frames(&set, &set, 0.0).is_err());
        assert!(match_frames(&set, &set, f32::INFINITY).is_err());
    }
}
