//! Intensity images and frame stacks.
//!
//! Images are stored row-major as `[row, col]`, i.e. `[y, x]`. Public accessors
//! take `(x, y)` to match the coordinate convention used by features.

use crate::error::{FibrilError, Result};
use crate::geometry::{pixel_of, Coordinate};
use ndarray::{Array2, Array3, ArrayView2, Axis};

/// A single 2D intensity image with finite `f32` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: Array2<f32>,
}

impl Image {
    /// Wrap an array, rejecting empty extents and non-finite values.
    pub fn new(data: Array2<f32>) -> Result<Self> {
        let (rows, cols) = data.dim();
        if rows == 0 || cols == 0 {
            return Err(FibrilError::InvalidImage(format!(
                "image has zero extent ({}x{})",
                rows, cols
            )));
        }
        if let Some(bad) = data.iter().find(|v| !v.is_finite()) {
            return Err(FibrilError::InvalidImage(format!(
                "non-finite pixel value {}",
                bad
            )));
        }
        Ok(Self { data })
    }

    /// Build an image from row-major values.
    pub fn from_vec(rows: usize, cols: usize, values: Vec<f32>) -> Result<Self> {
        let data = Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| FibrilError::InvalidImage(format!("bad shape {}x{}: {}", rows, cols, e)))?;
        Self::new(data)
    }

    /// Build an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f32) -> Result<Self> {
        Self::new(Array2::from_shape_fn((rows, cols), |(y, x)| f(x, y)))
    }

    /// Constant image.
    pub fn filled(rows: usize, cols: usize, value: f32) -> Result<Self> {
        Self::new(Array2::from_elem((rows, cols), value))
    }

    /// Wrap an array derived from a valid image (a filter output).
    /// Non-finite values are replaced with zero.
    pub fn from_derived(mut data: Array2<f32>) -> Self {
        debug_assert!(data.nrows() > 0 && data.ncols() > 0);
        data.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });
        Self { data }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Pixel value at `(x, y)`, or `None` outside the array.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> Option<f32> {
        if x < 0 || y < 0 {
            return None;
        }
        self.data.get((y as usize, x as usize)).copied()
    }

    /// Pixel value at in-bounds `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> f32 {
        self.data[(y, x)]
    }

    /// Sample at the coordinate's rounded pixel location.
    pub fn sample_rounded(&self, coord: Coordinate) -> Option<f32> {
        let (x, y) = pixel_of(coord);
        self.get(x, y)
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array2<f32> {
        self.data
    }

    /// Smallest and largest pixel value.
    pub fn min_max(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Apply `f` to every pixel.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Image {
        Image::from_derived(self.data.mapv(f))
    }
}

/// A frame-indexed stack of equally sized images.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStack {
    data: Array3<f32>,
}

impl ImageStack {
    /// Wrap a `(frames, rows, cols)` array.
    pub fn new(data: Array3<f32>) -> Result<Self> {
        let (frames, rows, cols) = data.dim();
        if frames == 0 || rows == 0 || cols == 0 {
            return Err(FibrilError::InvalidImage(format!(
                "stack has zero extent ({}x{}x{})",
                frames, rows, cols
            )));
        }
        if let Some(bad) = data.iter().find(|v| !v.is_finite()) {
            return Err(FibrilError::InvalidImage(format!(
                "non-finite pixel value {}",
                bad
            )));
        }
        Ok(Self { data })
    }

    /// Stack individual frames; all must share one shape.
    pub fn from_frames(frames: &[Image]) -> Result<Self> {
        let first = frames
            .first()
            .ok_or_else(|| FibrilError::InvalidImage("stack has no frames".into()))?;
        let shape = first.shape();
        for frame in frames {
            if frame.shape() != shape {
                return Err(FibrilError::ShapeMismatch {
                    expected: shape,
                    got: frame.shape(),
                });
            }
        }
        let mut data = Array3::zeros((frames.len(), shape.0, shape.1));
        for (mut slot, frame) in data.axis_iter_mut(Axis(0)).zip(frames) {
            slot.assign(frame.as_array());
        }
        Ok(Self { data })
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(rows, cols)` of every frame.
    pub fn frame_shape(&self) -> (usize, usize) {
        let (_, rows, cols) = self.data.dim();
        (rows, cols)
    }

    /// Copy out frame `index`.
    pub fn frame(&self, index: usize) -> Option<Image> {
        if index >= self.len() {
            return None;
        }
        Some(Image::from_derived(
            self.data.index_axis(Axis(0), index).to_owned(),
        ))
    }

    pub fn frames(&self) -> impl Iterator<Item = Image> + '_ {
        self.data
            .axis_iter(Axis(0))
            .map(|frame| Image::from_derived(frame.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_non_finite() {
        assert!(matches!(
            Image::from_vec(0, 4, vec![]),
            Err(FibrilError::InvalidImage(_))
        ));
        assert!(matches!(
            Image::from_vec(1, 2, vec![1.0, f32::NAN]),
            Err(FibrilError::InvalidImage(_))
        ));
        assert!(Image::from_vec(2, 2, vec![1.0; 3]).is_err());
    }

    #[test]
    fn test_xy_indexing() {
        let img = Image::from_fn(3, 4, |x, y| (y * 10 + x) as f32).unwrap();
        assert_eq!(img.shape(), (3, 4));
        assert_eq!(img.get(3, 2), Some(23.0));
        assert_eq!(img.get(4, 0), None);
        assert_eq!(img.get(-1, 0), None);
        assert_eq!(img.sample_rounded(Coordinate::new(1.6, 0.4)), Some(2.0));
    }

    #[test]
    fn test_stack_frames() {
        let a = Image::filled(2, 3, 1.0).unwrap();
        let b = Image::filled(2, 3, 2.0).unwrap();
        let stack = ImageStack::from_frames(&[a, b.clone()]).unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.frame_shape(), (2, 3));
        assert_eq!(stack.frame(1).unwrap(), b);
        assert!(stack.frame(2).is_none());
        assert_eq!(stack.frames().count(), 2);
    }

    #[test]
    fn test_stack_shape_mismatch() {
        let a = Image::filled(2, 3, 1.0).unwrap();
        let b = Image::filled(3, 3, 1.0).unwrap();
        assert!(matches!(
            ImageStack::from_frames(&[a, b]),
            Err(FibrilError::ShapeMismatch { .. })
        ));
        assert!(ImageStack::from_frames(&[]).is_err());
    }
}
