//! Laplacian of Gaussian blob enhancement.
//!
//! The LoG unclumping strategy inverts and contrast-stretches the image,
//! applies a LoG kernel sized from the object diameter, stretches the
//! response and thresholds it so everything below threshold becomes exactly
//! zero. Thresholding is automatic (masked Otsu over 256 bins) unless a
//! manual value in `[0, 1]` is configured.

use crate::masked_image::{BinaryImage, GrayF32Image};

/// Linearly rescale the values under `mask` to `[0, 1]`.
///
/// A constant field (or empty mask) maps to all zeros. Pixels outside the
/// mask are rescaled with the same affine map; callers must not rely on them.
pub fn stretch(field: &GrayF32Image, mask: &BinaryImage) -> GrayF32Image {
    let (w, h) = field.dimensions();
    let src = field.as_raw();
    let mask_raw = mask.as_raw();

    let mut min_v = f32::INFINITY;
    let mut max_v = f32::NEG_INFINITY;
    for (&v, &m) in src.iter().zip(mask_raw.iter()) {
        if m != 0 {
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }
    }
    let range = max_v - min_v;
    let data: Vec<f32> = if !range.is_finite() || range <= 0.0 {
        vec![0.0; src.len()]
    } else {
        src.iter().map(|&v| (v - min_v) / range).collect()
    };
    GrayF32Image::from_raw(w, h, data).expect("output dimensions match input")
}

/// Apply a Laplacian of Gaussian filter with the given kernel half-width.
///
/// The response is positive at the center of dark blobs, so callers feed the
/// inverted image (bright nuclei become dark) and look for response maxima.
/// Pixels outside the mask are treated as zero; the response near mask
/// boundaries is therefore biased, which is acceptable because the response
/// is contrast-stretched and thresholded afterwards.
pub fn laplacian_of_gaussian(
    field: &GrayF32Image,
    mask: &BinaryImage,
    half_width: u32,
    sigma: f32,
) -> GrayF32Image {
    let kernel = log_kernel(half_width as i32, sigma.max(0.1));
    let (w, h) = field.dimensions();
    let (wi, hi) = (w as i32, h as i32);
    let src = field.as_raw();
    let mask_raw = mask.as_raw();
    let k = half_width as i32;
    let kw = 2 * k + 1;

    let mut out = vec![0.0f32; src.len()];
    for y in 0..hi {
        for x in 0..wi {
            let mut acc = 0.0f32;
            for dy in -k..=k {
                let yi = y + dy;
                if yi < 0 || yi >= hi {
                    continue;
                }
                let krow = ((dy + k) * kw) as usize;
                let row = (yi * wi) as usize;
                for dx in -k..=k {
                    let xi = x + dx;
                    if xi < 0 || xi >= wi {
                        continue;
                    }
                    let i = row + xi as usize;
                    if mask_raw[i] != 0 {
                        acc += kernel[krow + (dx + k) as usize] * src[i];
                    }
                }
            }
            out[(y * wi + x) as usize] = acc;
        }
    }
    GrayF32Image::from_raw(w, h, out).expect("output dimensions match input")
}

/// Mean-subtracted LoG kernel of half-width `k`.
fn log_kernel(k: i32, sigma: f32) -> Vec<f32> {
    let sigma_sq = sigma * sigma;
    let kw = (2 * k + 1) as usize;
    let mut kernel = Vec::with_capacity(kw * kw);
    for dy in -k..=k {
        for dx in -k..=k {
            let r_sq = (dx * dx + dy * dy) as f32;
            let g = (-0.5 * r_sq / sigma_sq).exp();
            kernel.push((r_sq / sigma_sq - 2.0) * g / sigma_sq);
        }
    }
    // Remove the DC component so a constant region yields zero response.
    let mean = kernel.iter().sum::<f32>() / kernel.len() as f32;
    for v in &mut kernel {
        *v -= mean;
    }
    kernel
}

/// Otsu threshold of the masked values of a `[0, 1]` field, over 256 bins.
///
/// Returns 0.0 when the mask is empty or the histogram degenerates.
pub fn otsu_masked(field: &GrayF32Image, mask: &BinaryImage) -> f32 {
    const BINS: usize = 256;
    let mut hist = [0u32; BINS];
    let mut total = 0u64;
    for (&v, &m) in field.as_raw().iter().zip(mask.as_raw().iter()) {
        if m != 0 && v.is_finite() {
            let bin = ((v.clamp(0.0, 1.0)) * (BINS as f32 - 1.0)).round() as usize;
            hist[bin] += 1;
            total += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }

    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();
    let total = total as f64;

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_bin = 0usize;
    for (t, &c) in hist.iter().enumerate() {
        w_b += c as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }
        sum_b += t as f64 * c as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_bin = t;
        }
    }
    best_bin as f32 / (BINS as f32 - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn full_mask(w: u32, h: u32) -> BinaryImage {
        BinaryImage::from_pixel(w, h, Luma([1u8]))
    }

    #[test]
    fn stretch_maps_masked_extremes_to_unit_range() {
        let mut field = GrayF32Image::from_pixel(4, 1, Luma([0.4f32]));
        field.put_pixel(0, 0, Luma([0.2f32]));
        field.put_pixel(3, 0, Luma([0.6f32]));
        let out = stretch(&field, &full_mask(4, 1));
        assert_eq!(out.get_pixel(0, 0)[0], 0.0);
        assert_eq!(out.get_pixel(3, 0)[0], 1.0);
        assert!((out.get_pixel(1, 0)[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn stretch_of_constant_field_is_zero() {
        let field = GrayF32Image::from_pixel(5, 5, Luma([0.7f32]));
        let out = stretch(&field, &full_mask(5, 5));
        assert!(out.as_raw().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn log_response_peaks_at_dark_blob_center() {
        // Dark blob on a bright background, matching the inverted-image
        // convention the unclumping stage feeds this filter.
        let (w, h) = (41u32, 41u32);
        let mut field = GrayF32Image::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let dx = x as f32 - 20.0;
                let dy = y as f32 - 20.0;
                let v = 1.0 - (-(dx * dx + dy * dy) / 18.0).exp();
                field.put_pixel(x, y, Luma([v]));
            }
        }
        let out = laplacian_of_gaussian(&field, &full_mask(w, h), 7, 3.0);
        let center = out.get_pixel(20, 20)[0];
        assert!(center > 0.0, "dark blob center response must be positive");
        assert!(center > out.get_pixel(10, 10)[0]);
        assert!(center > out.get_pixel(20, 12)[0]);
    }

    #[test]
    fn otsu_separates_bimodal_values() {
        let mut field = GrayF32Image::new(20, 2);
        for x in 0..20u32 {
            field.put_pixel(x, 0, Luma([0.1f32]));
            field.put_pixel(x, 1, Luma([0.9f32]));
        }
        let t = otsu_masked(&field, &full_mask(20, 2));
        assert!(t > 0.1 && t < 0.9, "threshold {t} must split the modes");
    }

    #[test]
    fn otsu_of_empty_mask_is_zero() {
        let field = GrayF32Image::from_pixel(8, 8, Luma([0.5f32]));
        let mask = BinaryImage::new(8, 8);
        assert_eq!(otsu_masked(&field, &mask), 0.0);
    }
}
