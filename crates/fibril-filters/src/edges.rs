//! Binary edge maps and the providers that compute them.

use fibril_core::{FibrilError, Image, Result};
use imageproc::edges::canny;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::gray::{gaussian_blur, gradient_peak, to_gray, unsharp_mask};

/// Boolean mask marking ridge boundaries, same shape as its source image.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMap {
    mask: Array2<bool>,
}

impl EdgeMap {
    /// Wrap a `[row, col]` mask.
    pub fn from_mask(mask: Array2<bool>) -> Self {
        Self { mask }
    }

    /// A map with no edges.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            mask: Array2::from_elem((rows, cols), false),
        }
    }

    /// Build from a list of `(x, y)` edge pixels; out-of-range pixels are ignored.
    pub fn from_pixels(rows: usize, cols: usize, pixels: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut map = Self::empty(rows, cols);
        for (x, y) in pixels {
            if let Some(cell) = map.mask.get_mut((y, x)) {
                *cell = true;
            }
        }
        map
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        self.mask.dim()
    }

    /// Whether `(x, y)` is an edge, or `None` outside the map.
    #[inline]
    pub fn is_edge(&self, x: i64, y: i64) -> Option<bool> {
        if x < 0 || y < 0 {
            return None;
        }
        self.mask.get((y as usize, x as usize)).copied()
    }

    /// All edge pixels as `(x, y)` in row-major order.
    pub fn edge_pixels(&self) -> Vec<(usize, usize)> {
        self.mask
            .indexed_iter()
            .filter(|(_, &e)| e)
            .map(|((y, x), _)| (x, y))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.mask.iter().filter(|&&e| e).count()
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.mask
    }
}

/// Source of edge maps for the breadth measurement.
pub trait EdgeMapProvider: Send + Sync {
    fn edge_map(&self, image: &Image) -> Result<EdgeMap>;
}

/// A precomputed map serves every image unchanged.
impl EdgeMapProvider for EdgeMap {
    fn edge_map(&self, _image: &Image) -> Result<EdgeMap> {
        Ok(self.clone())
    }
}

/// Canny detector settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CannyParams {
    /// Unsharp-mask blur sigma.
    pub sharpen_sigma: f32,
    /// Unsharp-mask strength.
    pub sharpen_amount: f32,
    /// Smoothing sigma applied before the gradient.
    pub blur_sigma: f32,
    /// Weak threshold as a fraction of the strongest gradient.
    pub low_threshold: f32,
    /// Strong threshold as a fraction of the strongest gradient.
    pub high_threshold: f32,
    /// Connected edge components smaller than this are dropped.
    pub min_component: usize,
}

impl Default for CannyParams {
    fn default() -> Self {
        Self {
            sharpen_sigma: 1.0,
            sharpen_amount: 10.0,
            blur_sigma: 2.0,
            low_threshold: 0.1,
            high_threshold: 0.2,
            min_component: 3,
        }
    }
}

impl CannyParams {
    pub fn validate(&self) -> Result<()> {
        let sigmas = [
            ("sharpen_sigma", self.sharpen_sigma),
            ("sharpen_amount", self.sharpen_amount),
            ("blur_sigma", self.blur_sigma),
        ];
        for (name, value) in sigmas {
            if !value.is_finite() || value < 0.0 {
                return Err(FibrilError::InvalidParameter(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        let (low, high) = (self.low_threshold, self.high_threshold);
        if !low.is_finite() || !high.is_finite() || low < 0.0 || low > high {
            return Err(FibrilError::InvalidParameter(format!(
                "canny thresholds must satisfy 0 <= low <= high, got low {low}, high {high}"
            )));
        }
        Ok(())
    }
}

/// Blur `imageproc::edges::canny` applies before its own Sobel pass.
const CANNY_INNER_SIGMA: f32 = 1.4;

/// Default edge provider: normalize to 8-bit, sharpen, blur, then Canny.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CannyEdges {
    pub params: CannyParams,
}

impl CannyEdges {
    pub fn new(params: CannyParams) -> Self {
        Self { params }
    }
}

impl EdgeMapProvider for CannyEdges {
    fn edge_map(&self, image: &Image) -> Result<EdgeMap> {
        let p = &self.params;
        p.validate()?;
        let (rows, cols) = image.shape();

        let gray = to_gray(image);
        let sharpened = unsharp_mask(&gray, p.sharpen_sigma, p.sharpen_amount);
        let smoothed = gaussian_blur(&sharpened, p.blur_sigma);

        // Thresholds are fractions of the strongest gradient canny will see.
        let peak = gradient_peak(&smoothed, CANNY_INNER_SIGMA);
        if peak <= f32::EPSILON {
            return Ok(EdgeMap::empty(rows, cols));
        }

        let edges = canny(&smoothed, p.low_threshold * peak, p.high_threshold * peak);
        let mut mask = Array2::from_shape_fn((rows, cols), |(y, x)| edges.get_pixel(x as u32, y as u32).0[0] > 0);
        let removed = remove_small_components(&mut mask, p.min_component);

        let map = EdgeMap::from_mask(mask);
        debug!(edges = map.count(), removed, peak, "Computed edge map");
        Ok(map)
    }
}

const NEIGHBORS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

fn neighbors(y: usize, x: usize, rows: usize, cols: usize) -> impl Iterator<Item = (usize, usize)> {
    NEIGHBORS.iter().filter_map(move |&(dy, dx)| {
        let ny = y as isize + dy;
        let nx = x as isize + dx;
        (ny >= 0 && nx >= 0 && (ny as usize) < rows && (nx as usize) < cols).then(|| (ny as usize, nx as usize))
    })
}

/// Clear 8-connected components with fewer than `min_size` pixels.
/// Returns the number of pixels removed.
fn remove_small_components(mask: &mut Array2<bool>, min_size: usize) -> usize {
    if min_size <= 1 {
        return 0;
    }
    let (rows, cols) = mask.dim();
    let mut visited = Array2::from_elem((rows, cols), false);
    let mut removed = 0;

    for y in 0..rows {
        for x in 0..cols {
            if !mask[(y, x)] || visited[(y, x)] {
                continue;
            }
            let mut component = vec![(y, x)];
            visited[(y, x)] = true;
            let mut head = 0;
            while head < component.len() {
                let (cy, cx) = component[head];
                head += 1;
                for (ny, nx) in neighbors(cy, cx, rows, cols) {
                    if mask[(ny, nx)] && !visited[(ny, nx)] {
                        visited[(ny, nx)] = true;
                        component.push((ny, nx));
                    }
                }
            }
            if component.len() < min_size {
                removed += component.len();
                for (cy, cx) in component {
                    mask[(cy, cx)] = false;
                }
            }
        }
    }
    removed
}
