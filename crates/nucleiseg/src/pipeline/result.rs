use crate::masked_image::{BinaryImage, LabelImage};

/// Full segmentation result for a single image.
///
/// Besides the final label map the result carries the intermediate label
/// snapshots, so callers can show or measure exactly what each exclusion
/// filter removed.
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    /// Final label map, ids contiguous in `[1, object_count]`.
    pub labels: LabelImage,
    /// Labels after unclumping, before any exclusion filter.
    pub unedited_labels: LabelImage,
    /// Checkpoint after the lower size bound but before the upper one.
    pub small_removed_labels: LabelImage,
    /// Objects removed by the border filter (zero elsewhere).
    pub border_excluded_labels: LabelImage,
    /// Objects removed by the size filter (zero elsewhere).
    pub size_excluded_labels: LabelImage,
    /// One-pixel-wide outlines of the final objects.
    pub outlines: BinaryImage,
    /// Outlines of the objects removed by the border filter.
    pub border_excluded_outlines: BinaryImage,
    /// Outlines of the objects removed by the size filter.
    pub size_excluded_outlines: BinaryImage,
    /// Number of objects in `labels`.
    pub object_count: u32,
    /// Global binarization threshold actually applied.
    pub global_threshold: f32,
    /// Maxima suppression size used by the unclumping stage.
    pub maxima_suppression_size: f32,
    /// Smoothing filter size used by the unclumping stage.
    pub smoothing_filter_size: f32,
}

impl SegmentationResult {
    /// Construct an empty result for an image with the provided dimensions.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            labels: LabelImage::new(width, height),
            unedited_labels: LabelImage::new(width, height),
            small_removed_labels: LabelImage::new(width, height),
            border_excluded_labels: LabelImage::new(width, height),
            size_excluded_labels: LabelImage::new(width, height),
            outlines: BinaryImage::new(width, height),
            border_excluded_outlines: BinaryImage::new(width, height),
            size_excluded_outlines: BinaryImage::new(width, height),
            object_count: 0,
            global_threshold: 0.0,
            maxima_suppression_size: 0.0,
            smoothing_filter_size: 0.0,
        }
    }

    /// Per-run summary measurements of the final objects.
    pub fn summary(&self) -> SummaryStats {
        let mut areas = vec![0u64; self.object_count as usize + 1];
        let raw = self.labels.as_raw();
        for &v in raw {
            if v != 0 && (v as usize) < areas.len() {
                areas[v as usize] += 1;
            }
        }
        let mut diameters: Vec<f32> = areas[1..]
            .iter()
            .filter(|&&a| a > 0)
            .map(|&a| 2.0 * (a as f32 / std::f32::consts::PI).sqrt())
            .collect();
        diameters.sort_by(|a, b| a.total_cmp(b));

        let covered: u64 = areas[1..].iter().sum();
        let percent_covered = if raw.is_empty() {
            0.0
        } else {
            100.0 * covered as f32 / raw.len() as f32
        };

        SummaryStats {
            object_count: self.object_count,
            threshold: self.global_threshold,
            diameter_pct10: percentile(&diameters, 0.1),
            diameter_median: percentile(&diameters, 0.5),
            diameter_pct90: percentile(&diameters, 0.9),
            percent_covered,
            smoothing_filter_size: self.smoothing_filter_size,
            maxima_suppression_size: self.maxima_suppression_size,
        }
    }
}

/// Scalar measurements reported per segmentation run.
///
/// Object diameters are circle-equivalent: `2·sqrt(area/π)`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SummaryStats {
    pub object_count: u32,
    pub threshold: f32,
    pub diameter_pct10: f32,
    pub diameter_median: f32,
    pub diameter_pct90: f32,
    /// Percentage of image pixels covered by accepted objects.
    pub percent_covered: f32,
    pub smoothing_filter_size: f32,
    pub maxima_suppression_size: f32,
}

/// Linear-interpolated percentile of sorted values; 0.0 when empty.
fn percentile(sorted: &[f32], q: f32) -> f32 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f32;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = pos - lo as f32;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::draw_disc_labels;

    #[test]
    fn empty_result_reports_zero_stats() {
        let stats = SegmentationResult::empty(32, 32).summary();
        assert_eq!(stats.object_count, 0);
        assert_eq!(stats.diameter_median, 0.0);
        assert_eq!(stats.percent_covered, 0.0);
    }

    #[test]
    fn summary_diameters_match_drawn_discs() {
        let mut result = SegmentationResult::empty(100, 100);
        draw_disc_labels(&mut result.labels, (25, 25), 8.0, 1);
        draw_disc_labels(&mut result.labels, (70, 70), 12.0, 2);
        result.object_count = 2;
        let stats = result.summary();
        assert_eq!(stats.object_count, 2);
        // Circle-equivalent diameters recover the drawn radii.
        assert!((stats.diameter_pct10 - 16.0).abs() < 2.0);
        assert!((stats.diameter_pct90 - 24.0).abs() < 2.0);
        assert!(stats.percent_covered > 0.0 && stats.percent_covered < 100.0);
    }

    #[test]
    fn percentile_interpolates_between_samples() {
        let values = [10.0f32, 20.0, 30.0];
        assert_eq!(percentile(&values, 0.5), 20.0);
        assert_eq!(percentile(&values, 0.0), 10.0);
        assert_eq!(percentile(&values, 1.0), 30.0);
        assert!((percentile(&values, 0.25) - 15.0).abs() < 1e-6);
    }
}
