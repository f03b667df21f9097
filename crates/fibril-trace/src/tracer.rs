//! Ridge following over a band-pass filtered residual image.
//!
//! Seeds are taken in decreasing residual order. From each seed the ridge is
//! followed in both directions by choosing, at every one-pixel step, the
//! circular arc (radius at least `rmin`) with the highest mean residual ahead.
//! The residual around every traced point is then erased so later seeds pick
//! up other structures.

use std::f32::consts::PI;

use fibril_core::geometry::{arc_lengths, pixel_of, resample_unit, DEGENERATE_EPSILON};
use fibril_core::stats::median;
use fibril_core::{Coordinate, Feature, FeatureSet, FibrilError, Image, Result, Vec2};
use fibril_filters::bandpass;
use ndarray::Array2;
use tracing::{debug, info};

use crate::params::TracerParams;

/// Number of candidate arcs evaluated per step.
const ARC_COUNT: usize = 30;

/// Number of angles tried for a seed's initial direction.
const DIRECTION_COUNT: usize = 180;

/// Trace every ridge of `image` above the noise threshold.
pub fn trace(image: &Image, params: &TracerParams) -> Result<FeatureSet> {
    params.validate()?;
    let (rows, cols) = image.shape();
    let min_extent = params.min_extent();
    if rows < min_extent || cols < min_extent {
        return Err(FibrilError::InvalidParameter(format!(
            "image {}x{} is too small for nsm1 = {} (need at least {}x{})",
            rows, cols, params.nsm1, min_extent, min_extent
        )));
    }

    let clipped = clip_base_level(image, params.qthresh1);
    let filtered = bandpass(&clipped, params.nsm1)?;
    let mut residual = Residual::new(filtered.into_array(), params.border());

    let positives: Vec<f32> = residual.data.iter().copied().filter(|v| *v > 0.0).collect();
    let Some(level) = median(&positives) else {
        debug!("No positive band-pass response, nothing to trace");
        return Ok(FeatureSet::new());
    };
    let threshold = params.qthresh2 * level;

    let seeds = residual.seed_order(threshold);
    let mut set = FeatureSet::new();
    let mut iterations = 0usize;
    let mut rejected = 0usize;

    for (x, y) in seeds {
        if iterations >= params.nstruc {
            break;
        }
        // Seeds erased by an earlier trace are skipped without counting.
        if residual.data[(y, x)] <= 0.0 {
            continue;
        }
        iterations += 1;

        let seed = Coordinate::new(x as f32, y as f32);
        let angle = initial_direction(&residual, seed, params.rmin);
        let mut points = follow(&residual, seed, angle, params);
        points.reverse();
        points.extend(follow(&residual, seed, angle + PI, params).into_iter().skip(1));

        for point in &points {
            residual.erase(*point, params.erase_half_width());
        }

        let length = arc_lengths(&points).last().copied().unwrap_or(0.0);
        if length < params.lmin {
            rejected += 1;
            debug!(x, y, length, "Rejected short structure");
            continue;
        }
        let id = set.push(Feature::new(resample_unit(&points))?);
        debug!(id, x, y, length, "Traced feature");
    }

    info!(
        features = set.len(),
        seeds = iterations,
        rejected,
        threshold,
        "Ridge tracing complete"
    );
    Ok(set)
}

/// Raise pixels below `qthresh1 * median(positive pixels)` to that level.
fn clip_base_level(image: &Image, qthresh1: f32) -> Image {
    if qthresh1 <= 0.0 {
        return image.clone();
    }
    let positives: Vec<f32> = image.as_array().iter().copied().filter(|v| *v > 0.0).collect();
    match median(&positives) {
        Some(level) => {
            let base = qthresh1 * level;
            image.map(|v| v.max(base))
        }
        None => image.clone(),
    }
}

/// Positive part of the filtered image, with a zeroed border.
struct Residual {
    data: Array2<f32>,
}

impl Residual {
    fn new(mut data: Array2<f32>, border: usize) -> Self {
        let (rows, cols) = data.dim();
        for ((y, x), v) in data.indexed_iter_mut() {
            let in_border = y < border || x < border || y + border >= rows || x + border >= cols;
            if in_border || *v < 0.0 {
                *v = 0.0;
            }
        }
        Self { data }
    }

    /// Residual at the pixel nearest `p`; 0 outside the image.
    #[inline]
    fn sample(&self, p: Coordinate) -> f32 {
        let (x, y) = pixel_of(p);
        if x < 0 || y < 0 {
            return 0.0;
        }
        self.data.get((y as usize, x as usize)).copied().unwrap_or(0.0)
    }

    fn contains(&self, p: Coordinate) -> bool {
        let (x, y) = pixel_of(p);
        let (rows, cols) = self.data.dim();
        x >= 0 && y >= 0 && (x as usize) < cols && (y as usize) < rows
    }

    /// Pixels above `threshold` as `(x, y)`, strongest first, row-major on ties.
    ///
    /// Erasing only ever zeroes values, so walking this list and skipping
    /// zeroed pixels visits the same seeds as a fresh argmax per iteration.
    fn seed_order(&self, threshold: f32) -> Vec<(usize, usize)> {
        let mut candidates: Vec<(usize, usize, f32)> = self
            .data
            .indexed_iter()
            .filter(|(_, &v)| v > threshold && v > 0.0)
            .map(|((y, x), &v)| (x, y, v))
            .collect();
        candidates.sort_by(|a, b| b.2.total_cmp(&a.2).then((a.1, a.0).cmp(&(b.1, b.0))));
        candidates.into_iter().map(|(x, y, _)| (x, y)).collect()
    }

    fn erase(&mut self, center: Coordinate, half_width: usize) {
        let (cx, cy) = pixel_of(center);
        let (rows, cols) = self.data.dim();
        let w = half_width as i64;
        let y0 = (cy - w).max(0);
        let y1 = (cy + w).min(rows as i64 - 1);
        let x0 = (cx - w).max(0);
        let x1 = (cx + w).min(cols as i64 - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.data[(y as usize, x as usize)] = 0.0;
            }
        }
    }
}

/// Angle in `[0, pi)` whose centred segment of `rmin` samples has the highest
/// mean residual. The first angle wins ties.
fn initial_direction(residual: &Residual, seed: Coordinate, rmin: usize) -> f32 {
    let half = (rmin as f32 - 1.0) * 0.5;
    let mut best = (0.0f32, f32::NEG_INFINITY);
    for k in 0..DIRECTION_COUNT {
        let angle = k as f32 * PI / DIRECTION_COUNT as f32;
        let dir = Vec2::new(angle.cos(), angle.sin());
        let score = (0..rmin)
            .map(|s| residual.sample(seed + (s as f32 - half) * dir))
            .sum::<f32>()
            / rmin as f32;
        if score > best.1 {
            best = (angle, score);
        }
    }
    best.0
}

/// Signed radius of candidate arc `index`; every magnitude is at least `rmin`.
#[inline]
fn arc_radius(index: usize, rmin: f32) -> f32 {
    rmin / (-1.0 + 2.0 * index as f32 / (ARC_COUNT - 1) as f32)
}

/// Point at arc length `s` along a circle of signed `radius` leaving `origin`
/// with heading `angle`.
#[inline]
fn arc_point(origin: Coordinate, angle: f32, radius: f32, s: f32) -> Coordinate {
    let turn = angle + s / radius;
    origin + radius * Vec2::new(turn.sin() - angle.sin(), angle.cos() - turn.cos())
}

/// Follow the ridge from `seed` with initial heading `angle`.
///
/// Returns the visited points starting with the seed. Trailing samples on
/// zero residual are dropped.
fn follow(residual: &Residual, seed: Coordinate, angle: f32, params: &TracerParams) -> Vec<Coordinate> {
    let rmin = params.rmin as f32;
    let mut points = vec![seed];
    let mut position = seed;
    let mut heading = angle;
    let mut previous_arc: Option<usize> = None;
    let mut gap = 0usize;

    for _ in 0..params.max_steps {
        let candidates = match previous_arc {
            None => 0..ARC_COUNT,
            Some(ib) => ib.saturating_sub(1)..(ib + 2).min(ARC_COUNT),
        };

        let mut best: Option<(usize, f32)> = None;
        for ib in candidates {
            let radius = arc_radius(ib, rmin);
            let score = (1..=params.rmin)
                .map(|s| residual.sample(arc_point(position, heading, radius, s as f32)))
                .sum::<f32>()
                / rmin;
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((ib, score));
            }
        }
        let Some((ib, _)) = best else {
            break;
        };

        let new_heading = heading + 1.0 / arc_radius(ib, rmin);
        let step_angle = 0.5 * (heading + new_heading);
        let next = position + Vec2::new(step_angle.cos(), step_angle.sin());
        if !residual.contains(next) {
            break;
        }

        heading = new_heading;
        position = next;
        previous_arc = Some(ib);
        points.push(next);

        if residual.sample(next) > 0.0 {
            gap = 0;
        } else {
            gap += 1;
            if gap > params.ngap {
                break;
            }
        }
    }

    points.truncate(points.len() - gap);
    points
}
