//! Top-level pipeline orchestrator: binarize → unclump → exclusion filters.

use super::config::SegmentConfig;
use super::result::SegmentationResult;
use crate::error::ConfigError;
use crate::labels::{
    fill_holes, filter_on_border, filter_on_size, label_foreground, outline, relabel,
};
use crate::masked_image::{BinaryImage, LabelImage, MaskedImage};
use crate::smooth::smooth_with_sigma;
use crate::threshold::Thresholder;
use crate::unclump::separate_neighboring_objects;

/// Fixed light denoising blur applied before binarization, so isolated noise
/// pixels do not cross the threshold. The truncation width follows the
/// configured smoothing filter size.
const PRE_THRESHOLD_SIGMA: f32 = 1.0;

/// Run the full segmentation pipeline on one image.
///
/// Stages: threshold → fixed blur → binarize → label → fill holes → unclump
/// → border filter → size filter → fill holes → relabel → outlines. Each
/// destructive filter records a snapshot so the result can report exactly
/// what it removed.
pub fn segment(
    image: &MaskedImage,
    config: &SegmentConfig,
    thresholder: &dyn Thresholder,
) -> Result<SegmentationResult, ConfigError> {
    config.validate()?;
    let (w, h) = image.dimensions();
    let mask = image.mask_or_full();

    let (threshold_field, global_threshold) = thresholder.compute(image, None);
    tracing::debug!("global threshold {global_threshold:.4}");

    let blurred = smooth_with_sigma(
        image.pixels(),
        &mask,
        PRE_THRESHOLD_SIGMA,
        config.effective_smoothing_filter_size(),
    );
    let data: Vec<u8> = blurred
        .as_raw()
        .iter()
        .zip(threshold_field.as_raw().iter())
        .zip(mask.as_raw().iter())
        .map(|((&v, &t), &m)| u8::from(m != 0 && v >= t))
        .collect();
    let binary = BinaryImage::from_raw(w, h, data).expect("dimensions match image");

    let (mut labels, count) = label_foreground(&binary);
    tracing::debug!("{count} connected components above threshold");
    if config.fill_holes {
        labels = fill_holes(&labels);
    }

    let (mut labels, count, maxima_suppression_size) = separate_neighboring_objects(
        image,
        &labels,
        count,
        global_threshold,
        config.min_diameter,
        config.max_diameter,
        &config.unclump,
    );
    tracing::debug!("{count} objects after unclumping");

    let unedited_labels = labels.clone();

    let mut border_excluded_labels = LabelImage::new(w, h);
    if config.discard_border {
        let before = labels.clone();
        labels = filter_on_border(labels, image.mask());
        border_excluded_labels = excluded(&before, &labels);
    }

    let (mut labels, small_removed_labels, size_excluded_labels) = if config.discard_size {
        let before = labels.clone();
        let (filtered, small_removed) =
            filter_on_size(labels, count, config.min_diameter, config.max_diameter);
        let size_excluded = excluded(&before, &filtered);
        (filtered, small_removed, size_excluded)
    } else {
        let small_removed = labels.clone();
        (labels, small_removed, LabelImage::new(w, h))
    };

    // The watershed can carve holes into objects; close them again.
    if config.fill_holes {
        labels = fill_holes(&labels);
    }
    let (labels, object_count) = relabel(&labels);
    tracing::debug!("{object_count} objects after exclusion filters");
    let outlines = outline(&labels);
    let border_excluded_outlines = outline(&border_excluded_labels);
    let size_excluded_outlines = outline(&size_excluded_labels);

    Ok(SegmentationResult {
        labels,
        unedited_labels,
        small_removed_labels,
        border_excluded_labels,
        size_excluded_labels,
        outlines,
        border_excluded_outlines,
        size_excluded_outlines,
        object_count,
        global_threshold,
        maxima_suppression_size,
        smoothing_filter_size: config.effective_smoothing_filter_size(),
    })
}

/// Label map of the objects present in `before` but gone from `after`.
fn excluded(before: &LabelImage, after: &LabelImage) -> LabelImage {
    let (w, h) = before.dimensions();
    let data: Vec<u32> = before
        .as_raw()
        .iter()
        .zip(after.as_raw().iter())
        .map(|(&b, &a)| if a == 0 { b } else { 0 })
        .collect();
    LabelImage::from_raw(w, h, data).expect("dimensions match input maps")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masked_image::GrayF32Image;
    use crate::test_utils::{distinct_label_count, draw_disc_intensity, two_touching_discs};
    use crate::threshold::ManualThreshold;
    use crate::unclump::{DividingLineMethod, UnclumpMethod};
    use image::Luma;

    fn three_disc_scene() -> MaskedImage {
        // One keeper disc, one too-small disc, one disc clipped by the left
        // border.
        let mut pixels = GrayF32Image::from_pixel(120, 120, Luma([0.05f32]));
        draw_disc_intensity(&mut pixels, (70, 40), 12.0, 0.8, 0.3);
        draw_disc_intensity(&mut pixels, (40, 90), 3.0, 0.8, 0.4);
        draw_disc_intensity(&mut pixels, (5, 60), 12.0, 0.8, 0.3);
        MaskedImage::new(pixels)
    }

    #[test]
    fn full_pipeline_keeps_only_the_compliant_disc() {
        let image = three_disc_scene();
        let config = SegmentConfig::default();
        let result = segment(&image, &config, &ManualThreshold { value: 0.15 }).unwrap();

        assert_eq!(result.object_count, 1, "one disc survives border and size filters");
        assert_eq!(distinct_label_count(&result.labels), 1);
        assert!(distinct_label_count(&result.unedited_labels) >= 3);
        assert!(
            result.border_excluded_labels.as_raw().iter().any(|&v| v != 0),
            "the clipped disc must be recorded as border-excluded"
        );
        assert!(
            result.size_excluded_labels.as_raw().iter().any(|&v| v != 0),
            "the tiny disc must be recorded as size-excluded"
        );
        assert!(result.outlines.as_raw().iter().any(|&v| v != 0));
        // The surviving object sits where the keeper disc was drawn.
        assert_ne!(result.labels.get_pixel(70, 40)[0], 0);
    }

    #[test]
    fn excluded_objects_get_their_own_outline_maps() {
        let image = three_disc_scene();
        let result =
            segment(&image, &SegmentConfig::default(), &ManualThreshold { value: 0.15 }).unwrap();
        assert!(
            result.border_excluded_outlines.as_raw().iter().any(|&v| v != 0),
            "the clipped disc must leave a border-excluded outline"
        );
        assert!(
            result.size_excluded_outlines.as_raw().iter().any(|&v| v != 0),
            "the tiny disc must leave a size-excluded outline"
        );
        // Each outline map stays within the support of its label map.
        for (i, &o) in result.border_excluded_outlines.as_raw().iter().enumerate() {
            if o != 0 {
                assert_ne!(result.border_excluded_labels.as_raw()[i], 0);
            }
        }
        for (i, &o) in result.size_excluded_outlines.as_raw().iter().enumerate() {
            if o != 0 {
                assert_ne!(result.size_excluded_labels.as_raw()[i], 0);
            }
        }
    }

    #[test]
    fn exclusion_maps_partition_the_unedited_foreground() {
        let image = three_disc_scene();
        let result =
            segment(&image, &SegmentConfig::default(), &ManualThreshold { value: 0.15 }).unwrap();
        let final_raw = result.labels.as_raw();
        let border_raw = result.border_excluded_labels.as_raw();
        let size_raw = result.size_excluded_labels.as_raw();
        for (i, &u) in result.unedited_labels.as_raw().iter().enumerate() {
            let owners = u8::from(final_raw[i] != 0)
                + u8::from(border_raw[i] != 0)
                + u8::from(size_raw[i] != 0);
            if u != 0 {
                assert_eq!(owners, 1, "pixel {i} must end up in exactly one map");
            } else {
                assert_eq!(owners, 0, "pixel {i} was background before filtering");
            }
        }
    }

    #[test]
    fn border_objects_are_kept_when_the_filter_is_disabled() {
        let image = three_disc_scene();
        let config = SegmentConfig {
            discard_border: false,
            ..Default::default()
        };
        let result = segment(&image, &config, &ManualThreshold { value: 0.15 }).unwrap();
        assert_eq!(result.object_count, 2, "the clipped disc survives");
        assert!(result.border_excluded_labels.as_raw().iter().all(|&v| v == 0));
        assert_ne!(result.labels.get_pixel(5, 60)[0], 0);
    }

    #[test]
    fn all_background_image_yields_empty_result() {
        let image = MaskedImage::new(GrayF32Image::from_pixel(50, 50, Luma([0.02f32])));
        let result =
            segment(&image, &SegmentConfig::default(), &ManualThreshold { value: 0.5 }).unwrap();
        assert_eq!(result.object_count, 0);
        assert!(result.labels.as_raw().iter().all(|&v| v == 0));
        assert!(result.outlines.as_raw().iter().all(|&v| v == 0));
    }

    #[test]
    fn disabled_unclumping_keeps_touching_discs_merged() {
        let (image, ..) = two_touching_discs();
        let mut config = SegmentConfig {
            discard_size: false,
            discard_border: false,
            ..Default::default()
        };
        config.unclump.method = UnclumpMethod::None;
        config.unclump.dividing_line = DividingLineMethod::None;
        let result = segment(&image, &config, &ManualThreshold { value: 0.15 }).unwrap();
        assert_eq!(result.object_count, 1, "the touching discs stay one object");
    }

    #[test]
    fn intensity_unclumping_splits_touching_discs() {
        let (image, ..) = two_touching_discs();
        let mut config = SegmentConfig {
            min_diameter: 12.0,
            discard_size: false,
            discard_border: false,
            ..Default::default()
        };
        config.unclump.low_res_maxima = false;
        let result = segment(&image, &config, &ManualThreshold { value: 0.15 }).unwrap();
        assert_eq!(result.object_count, 2, "each intensity peak becomes one object");
    }

    #[test]
    fn invalid_config_fails_before_touching_pixels() {
        let image = three_disc_scene();
        let config = SegmentConfig {
            min_diameter: 50.0,
            max_diameter: 40.0,
            ..Default::default()
        };
        assert!(segment(&image, &config, &ManualThreshold { value: 0.5 }).is_err());
    }
}
