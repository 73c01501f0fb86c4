//! Threshold-computation seam.
//!
//! Threshold strategies are external collaborators to the segmentation core:
//! the pipeline only requires something that maps an image (plus optional
//! masking objects) to a per-pixel threshold field and a representative
//! global scalar. Two simple implementations ship with the crate so the CLI
//! runs end to end; richer strategies (adaptive, per-object) plug in through
//! the same trait.

use image::Luma;

use crate::log_filter::otsu_masked;
use crate::masked_image::{GrayF32Image, LabelImage, MaskedImage};

/// Produces the binarization threshold for a masked image.
///
/// The returned field has the same dimensions as the image (it may be
/// uniform); the scalar is used for reporting and for zeroing dim peaks in
/// the intensity unclumping strategy.
pub trait Thresholder {
    fn compute(
        &self,
        image: &MaskedImage,
        masking_objects: Option<&LabelImage>,
    ) -> (GrayF32Image, f32);
}

/// Global Otsu threshold over the masked pixels, with a correction factor
/// and clamp range.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GlobalOtsu {
    /// Multiplier applied to the raw Otsu value.
    pub correction_factor: f32,
    /// Lower clamp for the corrected threshold.
    pub min_threshold: f32,
    /// Upper clamp for the corrected threshold.
    pub max_threshold: f32,
}

impl Default for GlobalOtsu {
    fn default() -> Self {
        Self {
            correction_factor: 1.0,
            min_threshold: 0.0,
            max_threshold: 1.0,
        }
    }
}

impl Thresholder for GlobalOtsu {
    fn compute(
        &self,
        image: &MaskedImage,
        _masking_objects: Option<&LabelImage>,
    ) -> (GrayF32Image, f32) {
        let mask = image.mask_or_full();
        let raw = otsu_masked(image.pixels(), &mask);
        let t = (raw * self.correction_factor).clamp(self.min_threshold, self.max_threshold);
        let (w, h) = image.dimensions();
        (GrayF32Image::from_pixel(w, h, Luma([t])), t)
    }
}

/// Fixed user-supplied threshold.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ManualThreshold {
    pub value: f32,
}

impl Thresholder for ManualThreshold {
    fn compute(
        &self,
        image: &MaskedImage,
        _masking_objects: Option<&LabelImage>,
    ) -> (GrayF32Image, f32) {
        let (w, h) = image.dimensions();
        (
            GrayF32Image::from_pixel(w, h, Luma([self.value])),
            self.value,
        )
    }
}
