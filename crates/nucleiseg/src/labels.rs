//! Label-map operations: connected components, hole filling, relabeling,
//! per-object areas, border and size filtering, outline extraction.
//!
//! Filters take an owned label image and return a new owned one; the
//! pipeline snapshots copies before each destructive stage so every stage
//! can report exactly which pixels it removed.

use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::masked_image::{BinaryImage, LabelImage};

const NEIGHBORS_4: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const NEIGHBORS_8: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// 8-connected component labeling of a binary foreground.
///
/// Returns the label map and the number of objects found.
pub fn label_foreground(binary: &BinaryImage) -> (LabelImage, u32) {
    let labels = connected_components(binary, Connectivity::Eight, Luma([0u8]));
    let count = labels.as_raw().iter().copied().max().unwrap_or(0);
    (labels, count)
}

/// Fill background regions that are fully enclosed by a single object.
///
/// Background is segmented with 4-connectivity; a background component is a
/// hole when it does not touch the array border and all its 8-neighboring
/// object pixels carry one label. Holes bordered by two or more objects are
/// left open.
pub fn fill_holes(labels: &LabelImage) -> LabelImage {
    let (w, h) = labels.dimensions();
    let raw = labels.as_raw();

    let bg: Vec<u8> = raw.iter().map(|&v| u8::from(v == 0)).collect();
    let bg = BinaryImage::from_raw(w, h, bg).expect("dimensions match labels");
    let bg_components = connected_components(&bg, Connectivity::Four, Luma([0u8]));
    let bg_raw = bg_components.as_raw();
    let n_bg = bg_raw.iter().copied().max().unwrap_or(0) as usize;
    if n_bg == 0 {
        return labels.clone();
    }

    // Per background component: the single adjacent object label, or 0 when
    // conflicting/none; plus a border-touch flag.
    let mut owner = vec![0u32; n_bg + 1];
    let mut conflicted = vec![false; n_bg + 1];
    let mut touches_border = vec![false; n_bg + 1];
    let (wi, hi) = (w as i32, h as i32);
    for y in 0..hi {
        for x in 0..wi {
            let c = bg_raw[(y * wi + x) as usize] as usize;
            if c == 0 {
                continue;
            }
            if x == 0 || y == 0 || x == wi - 1 || y == hi - 1 {
                touches_border[c] = true;
            }
            for (dx, dy) in NEIGHBORS_8 {
                let xi = x + dx;
                let yi = y + dy;
                if xi < 0 || xi >= wi || yi < 0 || yi >= hi {
                    continue;
                }
                let l = raw[(yi * wi + xi) as usize];
                if l != 0 {
                    if owner[c] == 0 {
                        owner[c] = l;
                    } else if owner[c] != l {
                        conflicted[c] = true;
                    }
                }
            }
        }
    }

    let mut out = labels.clone();
    let out_raw: &mut [u32] = &mut out;
    for (i, &c) in bg_raw.iter().enumerate() {
        let c = c as usize;
        if c != 0 && !touches_border[c] && !conflicted[c] && owner[c] != 0 {
            out_raw[i] = owner[c];
        }
    }
    out
}

/// Compact surviving label ids to the contiguous range `[1..count]`,
/// preserving numeric order. Relabeling an already-contiguous map is a
/// no-op.
pub fn relabel(labels: &LabelImage) -> (LabelImage, u32) {
    let raw = labels.as_raw();
    let max_label = raw.iter().copied().max().unwrap_or(0) as usize;
    if max_label == 0 {
        return (labels.clone(), 0);
    }
    let mut present = vec![false; max_label + 1];
    for &v in raw {
        present[v as usize] = true;
    }
    let mut map = vec![0u32; max_label + 1];
    let mut next = 0u32;
    for (old, &p) in present.iter().enumerate().skip(1) {
        if p {
            next += 1;
            map[old] = next;
        }
    }
    let (w, h) = labels.dimensions();
    let data: Vec<u32> = raw.iter().map(|&v| map[v as usize]).collect();
    let out = LabelImage::from_raw(w, h, data).expect("dimensions match input");
    (out, next)
}

/// Pixel-count area per object id; index 0 holds the background count.
pub fn object_areas(labels: &LabelImage, count: u32) -> Vec<u32> {
    let mut areas = vec![0u32; count as usize + 1];
    for &v in labels.as_raw() {
        if (v as usize) < areas.len() {
            areas[v as usize] += 1;
        }
    }
    areas
}

/// Zero every object touching the array border.
///
/// When a validity mask is supplied and no object touches the hard border,
/// objects touching the mask edge (valid pixels 4-adjacent to invalid ones
/// or to the array border) are zeroed instead. This fallback handles
/// circular/elliptical regions of interest whose effective border is the
/// mask edge.
pub fn filter_on_border(labels: LabelImage, mask: Option<&BinaryImage>) -> LabelImage {
    let (w, h) = labels.dimensions();
    let max_label = labels.as_raw().iter().copied().max().unwrap_or(0) as usize;
    if max_label == 0 {
        return labels;
    }

    let mut on_border = vec![false; max_label + 1];
    for x in 0..w {
        on_border[labels.get_pixel(x, 0)[0] as usize] = true;
        on_border[labels.get_pixel(x, h - 1)[0] as usize] = true;
    }
    for y in 0..h {
        on_border[labels.get_pixel(0, y)[0] as usize] = true;
        on_border[labels.get_pixel(w - 1, y)[0] as usize] = true;
    }

    if on_border[1..].iter().any(|&b| b) {
        return zero_flagged(labels, &on_border);
    }

    // Hard border clean: fall back to the mask edge when a mask exists.
    let Some(mask) = mask else {
        return labels;
    };
    let mask_raw = mask.as_raw();
    let (wi, hi) = (w as i32, h as i32);
    let mut on_mask_edge = vec![false; max_label + 1];
    let mut any = false;
    for y in 0..hi {
        for x in 0..wi {
            let i = (y * wi + x) as usize;
            if mask_raw[i] == 0 {
                continue;
            }
            let edge = NEIGHBORS_4.iter().any(|&(dx, dy)| {
                let xi = x + dx;
                let yi = y + dy;
                xi < 0 || xi >= wi || yi < 0 || yi >= hi || mask_raw[(yi * wi + xi) as usize] == 0
            });
            if edge {
                let l = labels.as_raw()[i] as usize;
                if l != 0 {
                    on_mask_edge[l] = true;
                    any = true;
                }
            }
        }
    }
    if any {
        zero_flagged(labels, &on_mask_edge)
    } else {
        labels
    }
}

fn zero_flagged(mut labels: LabelImage, flagged: &[bool]) -> LabelImage {
    let raw: &mut [u32] = &mut labels;
    for v in raw.iter_mut() {
        if flagged[*v as usize] {
            *v = 0;
        }
    }
    labels
}

/// Zero objects outside the diameter-derived area range.
///
/// The minimum and maximum allowed areas are those of circles with the given
/// diameters (`π·d²/4`). Returns the filtered map plus the "small removed"
/// checkpoint taken after the lower bound but before the upper bound is
/// applied.
pub fn filter_on_size(
    labels: LabelImage,
    count: u32,
    min_diameter: f32,
    max_diameter: f32,
) -> (LabelImage, LabelImage) {
    if count == 0 {
        let small_removed = labels.clone();
        return (labels, small_removed);
    }
    let areas = object_areas(&labels, count);
    let min_allowed = std::f32::consts::PI * min_diameter * min_diameter / 4.0;
    let max_allowed = std::f32::consts::PI * max_diameter * max_diameter / 4.0;

    let mut small_gone = labels;
    {
        let raw: &mut [u32] = &mut small_gone;
        for v in raw.iter_mut() {
            if *v != 0 && (areas[*v as usize] as f32) < min_allowed {
                *v = 0;
            }
        }
    }
    let small_removed = small_gone.clone();
    let mut filtered = small_gone;
    {
        let raw: &mut [u32] = &mut filtered;
        for v in raw.iter_mut() {
            if *v != 0 && (areas[*v as usize] as f32) > max_allowed {
                *v = 0;
            }
        }
    }
    (filtered, small_removed)
}

/// One-pixel-wide object boundaries.
///
/// A labeled pixel is on the outline when any 4-neighbor carries a different
/// value or lies outside the array.
pub fn outline(labels: &LabelImage) -> BinaryImage {
    let (w, h) = labels.dimensions();
    let (wi, hi) = (w as i32, h as i32);
    let raw = labels.as_raw();
    let mut out = vec![0u8; raw.len()];
    for y in 0..hi {
        for x in 0..wi {
            let i = (y * wi + x) as usize;
            let v = raw[i];
            if v == 0 {
                continue;
            }
            let boundary = NEIGHBORS_4.iter().any(|&(dx, dy)| {
                let xi = x + dx;
                let yi = y + dy;
                xi < 0 || xi >= wi || yi < 0 || yi >= hi || raw[(yi * wi + xi) as usize] != v
            });
            if boundary {
                out[i] = 1;
            }
        }
    }
    BinaryImage::from_raw(w, h, out).expect("dimensions match labels")
}
