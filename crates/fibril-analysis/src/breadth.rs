//! Local breadth measurement against an edge map.

use fibril_core::geometry::{perpendicular, pixel_of, tangent_at};
use fibril_core::{Coordinate, FibrilError, Result, Vec2};
use fibril_filters::EdgeMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::params::BreadthStrategy;

/// Settings of the edge-pair breadth search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgePairParams {
    /// Number of nearest edge pixels considered (default: 20).
    pub neighbors: usize,
    /// Edge pixels farther than this are ignored (default: 15).
    pub max_distance: f32,
    /// Search window half-size as a fraction of the larger image extent (default: 0.05).
    pub window_fraction: f32,
}

impl Default for EdgePairParams {
    fn default() -> Self {
        Self {
            neighbors: 20,
            max_distance: 15.0,
            window_fraction: 0.05,
        }
    }
}

impl EdgePairParams {
    pub fn validate(&self) -> Result<()> {
        if self.neighbors == 0 {
            return Err(FibrilError::InvalidParameter(
                "edge pair search needs at least one neighbor".into(),
            ));
        }
        if !self.max_distance.is_finite() || self.max_distance <= 0.0 {
            return Err(FibrilError::InvalidParameter(format!(
                "edge pair max_distance must be finite and positive, got {}",
                self.max_distance
            )));
        }
        if !self.window_fraction.is_finite() || self.window_fraction < 0.0 {
            return Err(FibrilError::InvalidParameter(format!(
                "edge pair window_fraction must be finite and non-negative, got {}",
                self.window_fraction
            )));
        }
        Ok(())
    }

    /// Half-size of the square search window for an image of `(rows, cols)`.
    pub fn half_window(&self, (rows, cols): (usize, usize)) -> i64 {
        let scaled = (self.window_fraction * rows.max(cols) as f32).round() as i64;
        scaled.max(3)
    }
}

/// Breadth of every coordinate of one feature, in trace order.
///
/// The tangent at coordinate `i` comes from its neighbours `i - 1` and
/// `i + 1`; a zero-length tangent gives breadth 0.
pub fn measure_breadths(strategy: &BreadthStrategy, edges: &EdgeMap, coords: &[Coordinate]) -> Vec<f32> {
    let half_window = match strategy {
        BreadthStrategy::EdgePair(p) => p.half_window(edges.shape()),
        BreadthStrategy::RayCast => 0,
    };
    (0..coords.len())
        .map(|i| {
            let Some(normal) = perpendicular(tangent_at(coords, i)) else {
                return 0.0;
            };
            match strategy {
                BreadthStrategy::RayCast => ray_cast(edges, coords[i], normal),
                BreadthStrategy::EdgePair(p) => edge_pair(edges, coords[i], normal, p, half_window),
            }
        })
        .collect()
}

/// Count non-edge pixels from the coordinate outwards along the rounded normal,
/// in both directions.
fn ray_cast(edges: &EdgeMap, coord: Coordinate, normal: Vec2) -> f32 {
    let step = (normal.x.round() as i64, normal.y.round() as i64);
    let origin = pixel_of(coord);
    let forward = walk_to_edge(edges, origin, step);
    let backward = walk_to_edge(edges, origin, (-step.0, -step.1));
    (forward + backward) as f32
}

/// Pixels visited before the first edge; 0 if the walk leaves the map first.
fn walk_to_edge(edges: &EdgeMap, (mut x, mut y): (i64, i64), (dx, dy): (i64, i64)) -> u32 {
    let mut count = 0;
    loop {
        match edges.is_edge(x, y) {
            Some(true) => return count,
            Some(false) => {
                count += 1;
                x += dx;
                y += dy;
            }
            None => return 0,
        }
    }
}

/// Distance between the nearest edge pixel on each side of the ridge.
fn edge_pair(edges: &EdgeMap, coord: Coordinate, normal: Vec2, params: &EdgePairParams, half_window: i64) -> f32 {
    let (cx, cy) = pixel_of(coord);
    let mut nearby: SmallVec<[(f32, i64, i64); 32]> = SmallVec::new();
    for y in cy - half_window..=cy + half_window {
        for x in cx - half_window..=cx + half_window {
            if edges.is_edge(x, y) != Some(true) {
                continue;
            }
            let distance = Vec2::new(x as f32, y as f32).distance(coord);
            if distance <= params.max_distance {
                nearby.push((distance, y, x));
            }
        }
    }
    nearby.sort_by(|a, b| a.0.total_cmp(&b.0).then((a.1, a.2).cmp(&(b.1, b.2))));
    nearby.truncate(params.neighbors);

    let mut above: Option<Vec2> = None;
    let mut below: Option<Vec2> = None;
    for &(_, y, x) in &nearby {
        let pixel = Vec2::new(x as f32, y as f32);
        let projection = (pixel - coord).dot(normal);
        if projection > 0.0 && above.is_none() {
            above = Some(pixel);
        } else if projection < 0.0 && below.is_none() {
            below = Some(pixel);
        }
    }
    match (above, below) {
        (Some(a), Some(b)) => a.distance(b),
        _ => 0.0,
    }
}
