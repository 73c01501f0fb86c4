//! Splitting touching objects into candidate seeds and re-drawing their
//! boundaries.
//!
//! A connected foreground blob may hold several objects. The unclumping
//! method places one marker per candidate object (intensity peaks, distance
//! transform peaks, or LoG response peaks); the dividing-line method then
//! builds the cost surface the seeded watershed floods to assign every blob
//! pixel to one marker.

use image::imageops::{self, FilterType};
use rand::{Rng, SeedableRng};

use crate::labels::label_foreground;
use crate::log_filter::{laplacian_of_gaussian, otsu_masked, stretch};
use crate::masked_image::{BinaryImage, GrayF32Image, LabelImage, MaskedImage};
use crate::maxima::{find_maxima, strel_disk};
use crate::smooth::smooth_with_sigma;
use crate::watershed::seeded_watershed;

/// Suppression size reported when unclumping is skipped entirely.
pub const DEFAULT_MAXIMA_SUPPRESSION: f32 = 7.0;

/// How candidate object seeds are found within a foreground blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum UnclumpMethod {
    /// Local maxima of the smoothed intensity image.
    #[default]
    Intensity,
    /// Local maxima of the distance transform of the binary foreground.
    Shape,
    /// Local maxima of a thresholded Laplacian-of-Gaussian response.
    LaplacianOfGaussian,
    /// No unclumping: each blob is one object.
    None,
}

/// How the dividing line between touching objects is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum DividingLineMethod {
    /// Watershed on the inverted intensity image (floods stop at bright ridges).
    #[default]
    Intensity,
    /// Watershed on the negated distance transform (dividing lines at shape
    /// indentations).
    Distance,
    /// Skip the watershed; keep the pre-unclump labeling.
    None,
}

/// Configuration for seed finding and boundary drawing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UnclumpConfig {
    pub method: UnclumpMethod,
    pub dividing_line: DividingLineMethod,
    /// Smoothing filter size in pixels; `None` derives it from the minimum
    /// object diameter.
    pub smoothing_filter_size: Option<f32>,
    /// Maxima suppression distance in pixels; `None` derives it from the
    /// minimum object diameter.
    pub maxima_suppression_size: Option<f32>,
    /// Find maxima on a downsampled field when objects are large.
    pub low_res_maxima: bool,
    /// Seed for the Shape strategy's tie-breaking jitter. Fixed so identical
    /// inputs always produce identical outputs.
    pub shape_jitter_seed: u64,
    /// LoG response threshold in `[0, 1]`; `None` uses masked Otsu.
    pub log_threshold: Option<f32>,
    /// LoG filter diameter in pixels; `None` derives it from the object
    /// diameter range.
    pub log_diameter: Option<f32>,
}

impl Default for UnclumpConfig {
    fn default() -> Self {
        Self {
            method: UnclumpMethod::default(),
            dividing_line: DividingLineMethod::default(),
            smoothing_filter_size: None,
            maxima_suppression_size: None,
            low_res_maxima: true,
            shape_jitter_seed: 0,
            log_threshold: None,
            log_diameter: None,
        }
    }
}

impl UnclumpConfig {
    /// Effective smoothing filter size: `2.35 · min_diameter / 3.5` in
    /// automatic mode.
    pub fn effective_filter_size(&self, min_diameter: f32) -> f32 {
        self.smoothing_filter_size
            .unwrap_or(2.35 * min_diameter / 3.5)
    }
}

/// Split touching objects within each foreground blob.
///
/// Returns the revised label image, the revised object count, and the
/// effective maxima suppression size used. When either method is `None` the
/// input labeling is returned unchanged with the default suppression size.
pub fn separate_neighboring_objects(
    image: &MaskedImage,
    labels: &LabelImage,
    object_count: u32,
    threshold: f32,
    min_diameter: f32,
    max_diameter: f32,
    config: &UnclumpConfig,
) -> (LabelImage, u32, f32) {
    if config.method == UnclumpMethod::None || config.dividing_line == DividingLineMethod::None {
        return (labels.clone(), object_count, DEFAULT_MAXIMA_SUPPRESSION);
    }

    let mask = image.mask_or_full();
    let filter_size = config.effective_filter_size(min_diameter);
    let blurred = smooth_with_sigma(image.pixels(), &mask, filter_size / 2.35, filter_size);

    // Large objects are found on a downsampled field for speed; the
    // suppression distance scales along with it.
    let (resize_factor, suppression_size) = if config.low_res_maxima && min_diameter > 10.0 {
        let factor = 10.0 / min_diameter;
        let size = config
            .maxima_suppression_size
            .map(|v| v * factor + 0.5)
            .unwrap_or(DEFAULT_MAXIMA_SUPPRESSION);
        (factor, size)
    } else {
        let size = config
            .maxima_suppression_size
            .unwrap_or(min_diameter / 1.5);
        (1.0, size)
    };
    let footprint = strel_disk(suppression_size - 0.5);

    let mut distance: Option<GrayF32Image> = None;
    let maxima_image = match config.method {
        UnclumpMethod::Intensity => {
            // Dim peaks below the binarization threshold are not seeds.
            let mut field = blurred.clone();
            let data: &mut [f32] = &mut field;
            for v in data.iter_mut() {
                if *v < threshold {
                    *v = 0.0;
                }
            }
            find_maxima(&field, labels, &footprint, resize_factor)
        }
        UnclumpMethod::Shape => {
            let jittered = jittered_distance_transform(labels, config.shape_jitter_seed);
            let maxima = find_maxima(&jittered, labels, &footprint, resize_factor);
            distance = Some(jittered);
            maxima
        }
        UnclumpMethod::LaplacianOfGaussian => {
            let log_image = log_response(
                image.pixels(),
                &mask,
                min_diameter,
                max_diameter,
                resize_factor,
                config,
            );
            find_maxima(&log_image, labels, &footprint, resize_factor)
        }
        UnclumpMethod::None => unreachable!("handled by the early return"),
    };

    let cost = match config.dividing_line {
        DividingLineMethod::Intensity => {
            // Invert so bright object cores become valleys and dim dividing
            // lines become ridges the floods meet at.
            let (w, h) = image.dimensions();
            let data: Vec<f32> = image.pixels().as_raw().iter().map(|&v| 1.0 - v).collect();
            GrayF32Image::from_raw(w, h, data).expect("dimensions match image")
        }
        DividingLineMethod::Distance => {
            // The Shape branch reuses its jittered field; other methods get
            // the plain transform.
            let d = distance.unwrap_or_else(|| distance_transform(labels));
            // Negate and shift non-negative: clump centers become the
            // deepest basins.
            let max_d = d.as_raw().iter().cloned().fold(0.0f32, f32::max);
            let (w, h) = d.dimensions();
            let data: Vec<f32> = d.as_raw().iter().map(|&v| max_d - v).collect();
            GrayF32Image::from_raw(w, h, data).expect("dimensions match distance field")
        }
        DividingLineMethod::None => unreachable!("handled by the early return"),
    };

    // Each 8-connected cluster of surviving maxima becomes one seed.
    let (w, h) = maxima_image.dimensions();
    let seeds: Vec<u8> = maxima_image
        .as_raw()
        .iter()
        .map(|&v| u8::from(v > 0.0))
        .collect();
    let seeds = BinaryImage::from_raw(w, h, seeds).expect("dimensions match maxima image");
    let (markers, seed_count) = label_foreground(&seeds);

    let out = seeded_watershed(&cost, &markers, labels);
    (out, seed_count, suppression_size)
}

/// Euclidean distance of each foreground pixel to the nearest background
/// pixel, plus small seeded jitter so broad plateaus break into unique
/// maxima.
fn jittered_distance_transform(labels: &LabelImage, seed: u64) -> GrayF32Image {
    let mut field = distance_transform(labels);
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let data: &mut [f32] = &mut field;
    for v in data.iter_mut() {
        *v += rng.gen_range(0.0..0.001f32);
    }
    field
}

/// Euclidean distance transform of `labels != 0`.
fn distance_transform(labels: &LabelImage) -> GrayF32Image {
    let (w, h) = labels.dimensions();
    // Feed the inverted foreground: the transform measures distance to the
    // nearest nonzero input pixel, so background must be the nonzero set.
    let inverted: Vec<u8> = labels.as_raw().iter().map(|&v| u8::from(v == 0)).collect();
    let inverted = BinaryImage::from_raw(w, h, inverted).expect("dimensions match labels");
    let sq = imageproc::distance_transform::euclidean_squared_distance_transform(&inverted);
    let data: Vec<f32> = sq.as_raw().iter().map(|&v| (v as f32).sqrt()).collect();
    GrayF32Image::from_raw(w, h, data).expect("dimensions match labels")
}

/// Inverted, contrast-stretched LoG response, thresholded so sub-threshold
/// response is exactly zero.
fn log_response(
    pixels: &GrayF32Image,
    mask: &BinaryImage,
    min_diameter: f32,
    max_diameter: f32,
    resize_factor: f32,
    config: &UnclumpConfig,
) -> GrayF32Image {
    let (w, h) = pixels.dimensions();
    let mut diameter = config
        .log_diameter
        .unwrap_or((max_diameter.min(min_diameter * min_diameter) + min_diameter * 5.0) / 6.0);
    let mut sigma = diameter / 2.35;

    let shrunken = resize_factor < 1.0;
    let (work_pixels, work_mask) = if shrunken {
        let sw = ((w as f32 * resize_factor).round() as u32).max(1);
        let sh = ((h as f32 * resize_factor).round() as u32).max(1);
        let small = imageops::resize(pixels, sw, sh, FilterType::Triangle);
        let mask_f: Vec<f32> = mask.as_raw().iter().map(|&v| f32::from(v)).collect();
        let mask_f = GrayF32Image::from_raw(w, h, mask_f).expect("dimensions match mask");
        let small_mask_f = imageops::resize(&mask_f, sw, sh, FilterType::Triangle);
        let small_mask: Vec<u8> = small_mask_f
            .as_raw()
            .iter()
            .map(|&v| u8::from(v > 0.99))
            .collect();
        let small_mask =
            BinaryImage::from_raw(sw, sh, small_mask).expect("resized dimensions requested");
        diameter = diameter * resize_factor + 1.0;
        sigma *= resize_factor;
        (small, small_mask)
    } else {
        (pixels.clone(), mask.clone())
    };

    // Bright nuclei become dark blobs the LoG kernel responds to.
    let stretched = stretch(&work_pixels, &work_mask);
    let inverted: Vec<f32> = stretched.as_raw().iter().map(|&v| 1.0 - v).collect();
    let inverted = GrayF32Image::from_raw(work_pixels.width(), work_pixels.height(), inverted)
        .expect("dimensions match working image");

    let half_width = ((diameter * 1.5) as u32).max(1);
    let mut log_image = laplacian_of_gaussian(&inverted, &work_mask, half_width, sigma);
    if shrunken {
        log_image = imageops::resize(&log_image, w, h, FilterType::Triangle);
    }
    let mut log_image = stretch(&log_image, mask);

    let log_threshold = config
        .log_threshold
        .unwrap_or_else(|| otsu_masked(&log_image, mask));
    let data: &mut [f32] = &mut log_image;
    for v in data.iter_mut() {
        *v = v.max(log_threshold) - log_threshold;
    }
    log_image
}
