//! Boxcar smoothing and intensity normalization on `f32` images.

use fibril_core::{FibrilError, Image, Result};
use ndarray::Array2;

/// Boxcar mean over a `width x width` window centred on each pixel.
///
/// Even widths are widened by one so the window stays centred. Windows are
/// truncated at the border and averaged over the in-bounds pixels only.
pub fn box_smooth(image: &Image, width: usize) -> Result<Image> {
    if width == 0 {
        return Err(FibrilError::InvalidParameter(
            "boxcar width must be at least 1".into(),
        ));
    }
    if width == 1 {
        return Ok(image.clone());
    }
    let radius = (width | 1) / 2;
    let (rows, cols) = image.shape();

    // Summed-area table with a zero row and column in front.
    let mut sat = Array2::<f64>::zeros((rows + 1, cols + 1));
    for y in 0..rows {
        let mut row_sum = 0.0f64;
        for x in 0..cols {
            row_sum += image.pixel(x, y) as f64;
            sat[(y + 1, x + 1)] = sat[(y, x + 1)] + row_sum;
        }
    }

    let out = Array2::from_shape_fn((rows, cols), |(y, x)| {
        let y0 = y.saturating_sub(radius);
        let x0 = x.saturating_sub(radius);
        let y1 = (y + radius + 1).min(rows);
        let x1 = (x + radius + 1).min(cols);
        let sum = sat[(y1, x1)] - sat[(y0, x1)] - sat[(y1, x0)] + sat[(y0, x0)];
        (sum / ((y1 - y0) * (x1 - x0)) as f64) as f32
    });
    Ok(Image::from_derived(out))
}

/// Band-pass filter: `box_smooth(nsm1) - box_smooth(nsm1 + 2)`.
pub fn bandpass(image: &Image, nsm1: usize) -> Result<Image> {
    let low = box_smooth(image, nsm1)?;
    let high = box_smooth(image, nsm1 + 2)?;
    Ok(Image::from_derived(low.as_array() - high.as_array()))
}

/// Rescale to `[0, 1]`. A constant image maps to all zeros.
pub fn normalize_unit(image: &Image) -> Image {
    let (lo, hi) = image.min_max();
    let span = hi - lo;
    if span <= f32::EPSILON {
        return image.map(|_| 0.0);
    }
    image.map(|v| (v - lo) / span)
}
