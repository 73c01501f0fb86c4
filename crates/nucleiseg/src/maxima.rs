//! Local maxima detection on scalar fields.
//!
//! A pixel is a candidate maximum when no pixel inside its disk-shaped
//! footprint neighborhood exceeds it and its own value is nonzero. Plateaus
//! of touching candidates are reduced to a single representative pixel so
//! every physical peak yields exactly one marker. An optional low-resolution
//! fast path trades pixel-exactness near the resampling boundary for speed.

use image::imageops::{self, FilterType};
use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::masked_image::{BinaryImage, GrayF32Image, LabelImage};

/// Disk-shaped boolean footprint used as the maximum-filter neighborhood.
#[derive(Debug, Clone)]
pub struct DiskFootprint {
    offsets: Vec<(i32, i32)>,
}

/// Build a disk footprint containing every offset with `dx² + dy² <= radius²`.
///
/// A non-positive radius degenerates to the center pixel only.
pub fn strel_disk(radius: f32) -> DiskFootprint {
    let r = radius.max(0.0);
    let ri = r.floor() as i32;
    let r_sq = r * r;
    let mut offsets = Vec::new();
    for dy in -ri..=ri {
        for dx in -ri..=ri {
            if (dx * dx + dy * dy) as f32 <= r_sq {
                offsets.push((dx, dy));
            }
        }
    }
    if offsets.is_empty() {
        offsets.push((0, 0));
    }
    DiskFootprint { offsets }
}

impl DiskFootprint {
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Grey-scale maximum filter over the footprint, clamped at image borders.
pub(crate) fn maximum_filter(field: &GrayF32Image, footprint: &DiskFootprint) -> Vec<f32> {
    let (w, h) = field.dimensions();
    let (w, h) = (w as i32, h as i32);
    let src = field.as_raw();
    let mut out = vec![f32::NEG_INFINITY; src.len()];
    for y in 0..h {
        for x in 0..w {
            let mut best = f32::NEG_INFINITY;
            for &(dx, dy) in &footprint.offsets {
                let xi = x + dx;
                let yi = y + dy;
                if xi >= 0 && xi < w && yi >= 0 && yi < h {
                    let v = src[(yi * w + xi) as usize];
                    if v > best {
                        best = v;
                    }
                }
            }
            out[(y * w + x) as usize] = best;
        }
    }
    out
}

/// Find isolated peak pixels of `field` inside the labeled foreground.
///
/// With `resize_factor < 1.0` the filter runs on a downsampled copy and the
/// binary candidate image is upsampled back (0.5 threshold on bilinear
/// resampling) before plateau reduction. The returned image is nonzero only
/// at surviving single-pixel peaks.
pub fn find_maxima(
    field: &GrayF32Image,
    foreground: &LabelImage,
    footprint: &DiskFootprint,
    resize_factor: f32,
) -> GrayF32Image {
    let (w, h) = field.dimensions();
    debug_assert_eq!(foreground.dimensions(), (w, h));

    let mut candidates = if resize_factor < 1.0 {
        let sw = ((w as f32 * resize_factor).round() as u32).max(1);
        let sh = ((h as f32 * resize_factor).round() as u32).max(1);
        let small = imageops::resize(field, sw, sh, FilterType::Triangle);
        let small_candidates = candidate_maxima(&small, footprint);
        upsample_candidates(&small_candidates, w, h)
    } else {
        candidate_maxima(field, footprint)
    };

    shrink_plateaus(&mut candidates);

    // Candidates on background are discarded.
    let labels_raw = foreground.as_raw();
    let data: &mut [f32] = &mut candidates;
    for (v, &l) in data.iter_mut().zip(labels_raw.iter()) {
        if l == 0 {
            *v = 0.0;
        }
    }
    candidates
}

/// Zero every pixel that is either zero-valued or strictly below some
/// neighbor inside the footprint.
fn candidate_maxima(field: &GrayF32Image, footprint: &DiskFootprint) -> GrayF32Image {
    let (w, h) = field.dimensions();
    let filtered = maximum_filter(field, footprint);
    let src = field.as_raw();
    let data: Vec<f32> = src
        .iter()
        .zip(filtered.iter())
        .map(|(&v, &m)| if v != 0.0 && v >= m { v } else { 0.0 })
        .collect();
    GrayF32Image::from_raw(w, h, data).expect("output dimensions match input")
}

/// Upsample a low-resolution candidate image to `(w, h)`.
///
/// The candidate set is carried as a 0/1 field thresholded at 0.5 after
/// bilinear resampling; candidate values are bilinearly resampled alongside.
fn upsample_candidates(small: &GrayF32Image, w: u32, h: u32) -> GrayF32Image {
    let binary_small = GrayF32Image::from_raw(
        small.width(),
        small.height(),
        small
            .as_raw()
            .iter()
            .map(|&v| if v > 0.0 { 1.0 } else { 0.0 })
            .collect(),
    )
    .expect("binary field dimensions match candidate image");
    let binary_up = imageops::resize(&binary_small, w, h, FilterType::Triangle);
    let values_up = imageops::resize(small, w, h, FilterType::Triangle);

    let data: Vec<f32> = binary_up
        .as_raw()
        .iter()
        .zip(values_up.as_raw().iter())
        .map(|(&b, &v)| if b > 0.5 && v > 0.0 { v } else { 0.0 })
        .collect();
    GrayF32Image::from_raw(w, h, data).expect("upsampled dimensions requested explicitly")
}

/// Reduce each 8-connected cluster of nonzero pixels to the single pixel
/// nearest the cluster centroid (ties broken by scan order).
fn shrink_plateaus(candidates: &mut GrayF32Image) {
    let (w, h) = candidates.dimensions();
    let raw = candidates.as_raw();
    let binary: Vec<u8> = raw.iter().map(|&v| u8::from(v > 0.0)).collect();
    let binary = BinaryImage::from_raw(w, h, binary).expect("dimensions match candidates");
    let clusters = connected_components(&binary, Connectivity::Eight, Luma([0u8]));
    let cluster_raw = clusters.as_raw();

    let n_clusters = cluster_raw.iter().copied().max().unwrap_or(0) as usize;
    if n_clusters == 0 {
        return;
    }

    // Accumulate centroids per cluster.
    let mut sum_x = vec![0.0f64; n_clusters + 1];
    let mut sum_y = vec![0.0f64; n_clusters + 1];
    let mut count = vec![0u32; n_clusters + 1];
    for y in 0..h {
        for x in 0..w {
            let c = cluster_raw[(y * w + x) as usize] as usize;
            if c != 0 {
                sum_x[c] += x as f64;
                sum_y[c] += y as f64;
                count[c] += 1;
            }
        }
    }

    // Pick the representative pixel per cluster.
    let mut best_dist = vec![f64::INFINITY; n_clusters + 1];
    let mut best_index = vec![usize::MAX; n_clusters + 1];
    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) as usize;
            let c = cluster_raw[i] as usize;
            if c == 0 {
                continue;
            }
            let cx = sum_x[c] / count[c] as f64;
            let cy = sum_y[c] / count[c] as f64;
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            let d = dx * dx + dy * dy;
            if d < best_dist[c] {
                best_dist[c] = d;
                best_index[c] = i;
            }
        }
    }

    let keep: std::collections::HashSet<usize> = best_index[1..].iter().copied().collect();
    let data: &mut [f32] = &mut *candidates;
    for i in 0..data.len() {
        if data[i] > 0.0 && !keep.contains(&i) {
            data[i] = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label_all_foreground(w: u32, h: u32) -> LabelImage {
        LabelImage::from_pixel(w, h, Luma([1u32]))
    }

    #[test]
    fn disk_footprint_radius_zero_is_center_only() {
        assert_eq!(strel_disk(0.0).len(), 1);
        // Radius 1.5 covers the 3x3 cross plus diagonals at distance sqrt(2).
        assert_eq!(strel_disk(1.5).len(), 9);
    }

    #[test]
    fn two_separated_peaks_both_survive() {
        let mut field = GrayF32Image::new(30, 10);
        field.put_pixel(5, 5, Luma([1.0f32]));
        field.put_pixel(24, 5, Luma([0.8f32]));
        let fp = strel_disk(3.0);
        let out = find_maxima(&field, &label_all_foreground(30, 10), &fp, 1.0);
        let peaks: Vec<usize> = out
            .as_raw()
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > 0.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(peaks.len(), 2, "both isolated peaks must survive");
    }

    #[test]
    fn plateau_collapses_to_single_pixel() {
        let mut field = GrayF32Image::new(20, 20);
        for y in 8..12 {
            for x in 8..12 {
                field.put_pixel(x, y, Luma([0.5f32]));
            }
        }
        let fp = strel_disk(2.0);
        let out = find_maxima(&field, &label_all_foreground(20, 20), &fp, 1.0);
        let n_peaks = out.as_raw().iter().filter(|&&v| v > 0.0).count();
        assert_eq!(n_peaks, 1, "a flat plateau must yield exactly one marker");
    }

    #[test]
    fn background_maxima_are_discarded() {
        let mut field = GrayF32Image::new(10, 10);
        field.put_pixel(2, 2, Luma([1.0f32]));
        field.put_pixel(7, 7, Luma([1.0f32]));
        let mut labels = LabelImage::new(10, 10);
        labels.put_pixel(2, 2, Luma([1u32]));
        // (7,7) stays background.
        let fp = strel_disk(1.5);
        let out = find_maxima(&field, &labels, &fp, 1.0);
        assert!(out.get_pixel(2, 2)[0] > 0.0);
        assert_eq!(out.get_pixel(7, 7)[0], 0.0);
    }

    #[test]
    fn suppression_footprint_merges_close_peaks() {
        let mut field = GrayF32Image::new(20, 20);
        field.put_pixel(9, 10, Luma([1.0f32]));
        field.put_pixel(11, 10, Luma([0.9f32]));
        let fp = strel_disk(4.0);
        let out = find_maxima(&field, &label_all_foreground(20, 20), &fp, 1.0);
        let n_peaks = out.as_raw().iter().filter(|&&v| v > 0.0).count();
        assert_eq!(n_peaks, 1, "the dimmer peak lies inside the brighter one's footprint");
    }

    #[test]
    fn low_res_path_still_finds_an_isolated_peak() {
        let mut field = GrayF32Image::new(60, 60);
        // Broad smooth bump so the peak survives bilinear downsampling.
        for y in 0..60u32 {
            for x in 0..60u32 {
                let dx = x as f32 - 30.0;
                let dy = y as f32 - 30.0;
                let v = (-(dx * dx + dy * dy) / 100.0).exp();
                field.put_pixel(x, y, Luma([v]));
            }
        }
        let fp = strel_disk(6.5);
        let out = find_maxima(&field, &label_all_foreground(60, 60), &fp, 0.5);
        let peaks: Vec<(u32, u32)> = (0..60u32)
            .flat_map(|y| (0..60u32).map(move |x| (x, y)))
            .filter(|&(x, y)| out.get_pixel(x, y)[0] > 0.0)
            .collect();
        assert_eq!(peaks.len(), 1, "expected exactly one peak, got {peaks:?}");
        let (px, py) = peaks[0];
        assert!(
            (px as i32 - 30).abs() <= 3 && (py as i32 - 30).abs() <= 3,
            "peak ({px},{py}) should land near (30,30)"
        );
    }
}
