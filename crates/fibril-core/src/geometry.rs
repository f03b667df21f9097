//! Geometric primitives for pixel-space feature geometry.

use glam::Vec2 as GlamVec2;

/// 2D vector.
pub type Vec2 = GlamVec2;

/// A point in image pixel space: `x` is the column, `y` the row.
pub type Coordinate = GlamVec2;

/// Tangents shorter than this are treated as undefined.
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// Round a coordinate to its pixel `(x, y)`.
#[inline]
pub fn pixel_of(coord: Coordinate) -> (i64, i64) {
    (coord.x.round() as i64, coord.y.round() as i64)
}

/// Local tangent at position `index` of an ordered coordinate sequence.
///
/// Uses the neighbours `index - 1` and `index + 1`; the first and last
/// coordinates reuse themselves as the missing neighbour.
pub fn tangent_at(coords: &[Coordinate], index: usize) -> Vec2 {
    if coords.is_empty() {
        return Vec2::ZERO;
    }
    let last = coords.len() - 1;
    let index = index.min(last);
    let prev = coords[index.saturating_sub(1)];
    let next = coords[(index + 1).min(last)];
    next - prev
}

/// Unit vector perpendicular to `tangent`, or `None` when the tangent is degenerate.
pub fn perpendicular(tangent: Vec2) -> Option<Vec2> {
    let len = tangent.length();
    if !len.is_finite() || len < DEGENERATE_EPSILON {
        return None;
    }
    Some(Vec2::new(-tangent.y, tangent.x) / len)
}

/// Cumulative arc length along an ordered sequence, starting at 0.
pub fn arc_lengths(coords: &[Coordinate]) -> Vec<f32> {
    let mut lengths = Vec::with_capacity(coords.len());
    let mut total = 0.0f32;
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            total += c.distance(coords[i - 1]);
        }
        lengths.push(total);
    }
    lengths
}

/// Mean of a set of coordinates.
pub fn mean_point(coords: &[Coordinate]) -> Option<Coordinate> {
    if coords.is_empty() {
        return None;
    }
    let sum = coords.iter().fold(Vec2::ZERO, |acc, c| acc + *c);
    Some(sum / coords.len() as f32)
}

/// Slack for float drift in arc length before the last unit sample is dropped.
pub const RESAMPLE_TOLERANCE: f32 = 1e-4;

/// Resample a polyline at unit arc-length spacing, `s = 0, 1, ..., floor(length)`.
pub fn resample_unit(points: &[Coordinate]) -> Vec<Coordinate> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let lengths = arc_lengths(points);
    let total = lengths[lengths.len() - 1];
    let count = (total + RESAMPLE_TOLERANCE).floor() as usize + 1;
    let last_segment = points.len() - 2;

    let mut out = Vec::with_capacity(count);
    let mut seg = 0usize;
    for k in 0..count {
        let s = k as f32;
        while seg < last_segment && lengths[seg + 1] < s {
            seg += 1;
        }
        let span = lengths[seg + 1] - lengths[seg];
        let t = if span > DEGENERATE_EPSILON {
            ((s - lengths[seg]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(points[seg].lerp(points[seg + 1], t));
    }
    out
}
