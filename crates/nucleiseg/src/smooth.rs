//! Mask-aware Gaussian smoothing.
//!
//! The blur is separable and uses constant (zero) boundary padding. To
//! compensate for the energy lost to zero padding near image edges and
//! invalid pixels, the 0/1 mask is convolved with the same kernel and the
//! blurred image is divided by that normalization field. Values outside the
//! mask are unspecified (the division may approach 0/0) and must not be
//! consumed by callers.

use crate::masked_image::{BinaryImage, GrayF32Image};

/// Smooth `image` with a kernel standard deviation of `filter_size / 2.35`,
/// truncated to `±max(filter_size / 2, 1)` samples.
///
/// `filter_size <= 0` is a deliberate no-op fast path returning the input
/// values unchanged.
pub fn smooth(image: &GrayF32Image, mask: &BinaryImage, filter_size: f32) -> GrayF32Image {
    smooth_with_sigma(image, mask, filter_size / 2.35, filter_size)
}

/// Smooth with an explicit kernel sigma and truncation width.
///
/// The foreground/background binarization pass uses a hard-coded sigma of 1
/// with the configured truncation width; the unclumping pass uses
/// `filter_size / 2.35`. Both share this implementation.
pub fn smooth_with_sigma(
    image: &GrayF32Image,
    mask: &BinaryImage,
    sigma: f32,
    filter_size: f32,
) -> GrayF32Image {
    if filter_size <= 0.0 {
        return image.clone();
    }
    let half_width = ((filter_size / 2.0) as i64).max(1) as usize;
    let kernel = gaussian_kernel(sigma, half_width);

    // Zero out invalid pixels, blur, then divide by the blurred mask.
    let (w, h) = image.dimensions();
    let n = (w * h) as usize;
    let src = image.as_raw();
    let mask_raw = mask.as_raw();

    let mut masked = vec![0.0f32; n];
    let mut weight = vec![0.0f32; n];
    for i in 0..n {
        if mask_raw[i] != 0 {
            masked[i] = src[i];
            weight[i] = 1.0;
        }
    }

    let blurred = convolve_separable(&masked, w as usize, h as usize, &kernel);
    let norm = convolve_separable(&weight, w as usize, h as usize, &kernel);

    let out: Vec<f32> = blurred
        .iter()
        .zip(norm.iter())
        .map(|(&v, &nv)| v / nv)
        .collect();
    GrayF32Image::from_raw(w, h, out).expect("output dimensions match input")
}

/// Unnormalized Gaussian taps over `[-half_width, half_width]`.
///
/// No sum-to-one normalization: the mask division in `smooth_with_sigma`
/// cancels the kernel mass exactly.
fn gaussian_kernel(sigma: f32, half_width: usize) -> Vec<f32> {
    let inv_two_sigma_sq = 0.5 / (sigma * sigma);
    let scale = 1.0 / ((2.0 * std::f32::consts::PI).sqrt() * sigma);
    (-(half_width as i64)..=half_width as i64)
        .map(|x| {
            let xf = x as f32;
            scale * (-xf * xf * inv_two_sigma_sq).exp()
        })
        .collect()
}

/// Row pass then column pass with constant-zero padding.
fn convolve_separable(data: &[f32], w: usize, h: usize, kernel: &[f32]) -> Vec<f32> {
    let half = kernel.len() / 2;
    let mut rows = vec![0.0f32; data.len()];
    for y in 0..h {
        let base = y * w;
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, &kv) in kernel.iter().enumerate() {
                let xi = x as i64 + k as i64 - half as i64;
                if xi >= 0 && (xi as usize) < w {
                    acc += kv * data[base + xi as usize];
                }
            }
            rows[base + x] = acc;
        }
    }
    let mut out = vec![0.0f32; data.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, &kv) in kernel.iter().enumerate() {
                let yi = y as i64 + k as i64 - half as i64;
                if yi >= 0 && (yi as usize) < h {
                    acc += kv * rows[yi as usize * w + x];
                }
            }
            out[y * w + x] = acc;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn full_mask(w: u32, h: u32) -> BinaryImage {
        BinaryImage::from_pixel(w, h, Luma([1u8]))
    }

    #[test]
    fn zero_filter_size_returns_input_unchanged() {
        let mut img = GrayF32Image::new(5, 5);
        img.put_pixel(2, 2, Luma([0.7f32]));
        img.put_pixel(0, 4, Luma([0.2f32]));
        let out = smooth(&img, &full_mask(5, 5), 0.0);
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn constant_image_stays_constant_despite_edges() {
        // The mask normalization must cancel zero-padding losses exactly,
        // so a constant image smooths to itself everywhere including corners.
        let img = GrayF32Image::from_pixel(16, 16, Luma([0.25f32]));
        let out = smooth(&img, &full_mask(16, 16), 8.0);
        for &v in out.as_raw() {
            assert!((v - 0.25).abs() < 1e-5, "expected 0.25, got {v}");
        }
    }

    #[test]
    fn smoothing_spreads_a_point_and_preserves_symmetry() {
        let mut img = GrayF32Image::new(11, 11);
        img.put_pixel(5, 5, Luma([1.0f32]));
        let out = smooth(&img, &full_mask(11, 11), 6.0);
        let c = out.get_pixel(5, 5)[0];
        let l = out.get_pixel(4, 5)[0];
        let r = out.get_pixel(6, 5)[0];
        assert!(c > l && c > r, "peak must stay at the center");
        assert!(l > 0.0 && (l - r).abs() < 1e-6, "kernel must be symmetric");
    }

    #[test]
    fn invalid_pixels_do_not_leak_into_valid_region() {
        // Left half masked out with huge values; right half constant.
        let mut img = GrayF32Image::from_pixel(12, 6, Luma([0.5f32]));
        let mut mask = full_mask(12, 6);
        for y in 0..6 {
            for x in 0..6 {
                img.put_pixel(x, y, Luma([1000.0f32]));
                mask.put_pixel(x, y, Luma([0u8]));
            }
        }
        let out = smooth(&img, &mask, 4.0);
        for y in 0..6 {
            for x in 6..12 {
                let v = out.get_pixel(x, y)[0];
                assert!((v - 0.5).abs() < 1e-4, "masked values leaked: {v} at ({x},{y})");
            }
        }
    }
}
