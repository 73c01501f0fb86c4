//! Synthetic fixtures shared by the unit tests.

use image::Luma;

use crate::masked_image::{GrayF32Image, LabelImage, MaskedImage};

/// Paint a filled disc of the given label id.
pub fn draw_disc_labels(labels: &mut LabelImage, center: (u32, u32), radius: f32, label: u32) {
    let (w, h) = labels.dimensions();
    let (cx, cy) = (center.0 as f32, center.1 as f32);
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if (dx * dx + dy * dy).sqrt() <= radius {
                labels.put_pixel(x, y, Luma([label]));
            }
        }
    }
}

/// Paint a disc whose intensity falls off linearly from `peak` at the center
/// to `edge` at the rim. Pixels outside the disc are left untouched.
pub fn draw_disc_intensity(
    image: &mut GrayF32Image,
    center: (u32, u32),
    radius: f32,
    peak: f32,
    edge: f32,
) {
    let (w, h) = image.dimensions();
    let (cx, cy) = (center.0 as f32, center.1 as f32);
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let d = (dx * dx + dy * dy).sqrt();
            if d <= radius {
                let v = peak + (edge - peak) * d / radius;
                if v > image.get_pixel(x, y)[0] {
                    image.put_pixel(x, y, Luma([v]));
                }
            }
        }
    }
}

/// Two overlapping bright discs forming one connected foreground blob.
///
/// Returns the image, the single-object label map, and the object count (1).
pub fn two_touching_discs() -> (MaskedImage, LabelImage, u32) {
    let (w, h) = (64u32, 40u32);
    let mut pixels = GrayF32Image::from_pixel(w, h, Luma([0.05f32]));
    draw_disc_intensity(&mut pixels, (22, 20), 12.0, 0.8, 0.2);
    draw_disc_intensity(&mut pixels, (42, 20), 12.0, 0.8, 0.2);

    let mut labels = LabelImage::new(w, h);
    draw_disc_labels(&mut labels, (22, 20), 12.0, 1);
    draw_disc_labels(&mut labels, (42, 20), 12.0, 1);
    (MaskedImage::new(pixels), labels, 1)
}

/// Number of distinct nonzero label ids in a label map.
pub fn distinct_label_count(labels: &LabelImage) -> usize {
    let mut seen: Vec<u32> = labels
        .as_raw()
        .iter()
        .copied()
        .filter(|&v| v != 0)
        .collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}
