//! Post-hoc relinking of completed tracks.
//!
//! A feature that briefly disappears (seeing gaps) ends one track and starts
//! another at nearly the same place. Completed tracks whose centroids lie
//! within `max_distance` and whose frame ranges do not overlap are grouped.

use fibril_core::{FibrilError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lifetime::{Track, TrackId};

/// A group of completed tracks judged to be one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedTrack {
    /// Member track ids, in order of acceptance.
    pub members: Vec<TrackId>,
    pub start_frames: Vec<usize>,
    pub end_frames: Vec<usize>,
    /// Sum of the member lifetimes.
    pub total_lifetime: u32,
}

fn frame_range(track: &Track) -> (usize, usize) {
    (track.start_frame, track.end_frame.unwrap_or_else(|| track.last_frame()))
}

/// Half-open overlap of `[start, end)` ranges.
fn overlaps(a: (usize, usize), b: (usize, usize)) -> bool {
    a.0.max(b.0) < a.1.min(b.1)
}

/// Group completed tracks, nearest centroid first.
///
/// Tracks are visited in input order; each unconsumed track gathers the
/// unconsumed others within `max_distance` whose ranges overlap none of the
/// members accepted so far. Ungrouped tracks come back as singletons.
pub fn link_completed(completed: &[Track], max_distance: f32) -> Result<Vec<LinkedTrack>> {
    if !max_distance.is_finite() || max_distance <= 0.0 {
        return Err(FibrilError::InvalidParameter(format!(
            "relink distance must be finite and positive, got {}",
            max_distance
        )));
    }

    let centroids: Vec<_> = completed.iter().map(Track::centroid).collect();
    let ranges: Vec<_> = completed.iter().map(frame_range).collect();
    let mut consumed = vec![false; completed.len()];
    let mut linked = Vec::new();

    for i in 0..completed.len() {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;

        let mut candidates: Vec<(f32, usize)> = (0..completed.len())
            .filter(|&j| !consumed[j])
            .map(|j| (centroids[i].distance(centroids[j]), j))
            .filter(|&(d, _)| d <= max_distance)
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut members = vec![i];
        for (_, j) in candidates {
            if members.iter().all(|&m| !overlaps(ranges[m], ranges[j])) {
                members.push(j);
                consumed[j] = true;
            }
        }

        if members.len() > 1 {
            debug!(members = members.len(), anchor = completed[i].id, "Linked completed tracks");
        }
        linked.push(LinkedTrack {
            members: members.iter().map(|&m| completed[m].id).collect(),
            start_frames: members.iter().map(|&m| ranges[m].0).collect(),
            end_frames: members.iter().map(|&m| ranges[m].1).collect(),
            total_lifetime: members
                .iter()
                .map(|&m| (ranges[m].1 - ranges[m].0) as u32)
                .sum(),
        });
    }
    Ok(linked)
}
