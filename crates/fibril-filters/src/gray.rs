//! 8-bit grayscale stages of the edge detector, backed by imageproc.

use fibril_core::Image;
use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use crate::smooth::normalize_unit;

/// Render an image as 8-bit grayscale, stretched to the full `[0, 255]` range.
pub fn to_gray(image: &Image) -> GrayImage {
    let unit = normalize_unit(image);
    GrayImage::from_fn(image.cols() as u32, image.rows() as u32, |x, y| {
        let v = unit.pixel(x as usize, y as usize) * 255.0;
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

/// Gaussian blur; `sigma <= 0` returns a copy.
pub fn gaussian_blur(gray: &GrayImage, sigma: f32) -> GrayImage {
    if sigma > 0.0 {
        gaussian_blur_f32(gray, sigma)
    } else {
        gray.clone()
    }
}

/// Unsharp mask `(1 + amount) * I - amount * blur(I)`, clamped to the input's range.
pub fn unsharp_mask(gray: &GrayImage, sigma: f32, amount: f32) -> GrayImage {
    let blurred = gaussian_blur(gray, sigma);
    let (lo, hi) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    let mut out = gray.clone();
    for (dst, src) in out.pixels_mut().zip(blurred.pixels()) {
        let v = (1.0 + amount) * dst.0[0] as f32 - amount * src.0[0] as f32;
        dst.0[0] = v.round().clamp(lo as f32, hi as f32) as u8;
    }
    out
}

/// Largest Sobel gradient magnitude after blurring with `sigma`.
pub fn gradient_peak(gray: &GrayImage, sigma: f32) -> f32 {
    let blurred = gaussian_blur(gray, sigma);
    let gx = horizontal_sobel(&blurred);
    let gy = vertical_sobel(&blurred);
    gx.as_raw()
        .iter()
        .zip(gy.as_raw())
        .map(|(&h, &v)| (h as f32).hypot(v as f32))
        .fold(0.0f32, f32::max)
}
