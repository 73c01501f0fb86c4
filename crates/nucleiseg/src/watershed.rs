//! Marker-based watershed flooding.
//!
//! Floods a cost surface from labeled seed pixels, assigning every masked
//! pixel to the seed whose flood front reaches it first. Fronts advance in
//! order of increasing cost; when several fronts compete at equal cost, the
//! pixel goes to the front that enqueued it earliest (FIFO), which produces
//! balanced boundaries between competing seeds instead of an arbitrary
//! tie-break. Flooding uses 8-connectivity and never leaves the mask.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::masked_image::{GrayF32Image, LabelImage};

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

/// One queued flood-front pixel. Ordered by cost, then insertion age.
struct FrontPixel {
    cost: f32,
    age: u64,
    index: usize,
    label: u32,
}

impl PartialEq for FrontPixel {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.age == other.age
    }
}

impl Eq for FrontPixel {}

impl PartialOrd for FrontPixel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontPixel {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we pop lowest cost first and,
        // at equal cost, the oldest entry (FIFO).
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.age.cmp(&self.age))
    }
}

/// Flood `cost` from `markers`, restricted to nonzero pixels of `mask_labels`.
///
/// Marker pixels keep their seed id; every other masked pixel receives the id
/// of the first front to reach it. Pixels outside the mask stay 0. Non-finite
/// costs are never expanded into.
pub fn seeded_watershed(
    cost: &GrayF32Image,
    markers: &LabelImage,
    mask_labels: &LabelImage,
) -> LabelImage {
    let (w, h) = cost.dimensions();
    debug_assert_eq!(markers.dimensions(), (w, h));
    debug_assert_eq!(mask_labels.dimensions(), (w, h));

    let cost_raw = cost.as_raw();
    let marker_raw = markers.as_raw();
    let mask_raw = mask_labels.as_raw();
    let n = cost_raw.len();

    let mut out = vec![0u32; n];
    let mut queued = vec![false; n];
    let mut heap = BinaryHeap::new();
    let mut age = 0u64;

    for i in 0..n {
        if marker_raw[i] != 0 && mask_raw[i] != 0 {
            heap.push(FrontPixel {
                cost: cost_raw[i],
                age,
                index: i,
                label: marker_raw[i],
            });
            age += 1;
            queued[i] = true;
        }
    }

    let (wi, hi) = (w as i32, h as i32);
    while let Some(FrontPixel { index, label, .. }) = heap.pop() {
        if out[index] != 0 {
            continue;
        }
        out[index] = label;

        let x = (index % w as usize) as i32;
        let y = (index / w as usize) as i32;
        for (dx, dy) in NEIGHBORS_8 {
            let xi = x + dx;
            let yi = y + dy;
            if xi < 0 || xi >= wi || yi < 0 || yi >= hi {
                continue;
            }
            let ni = (yi * wi + xi) as usize;
            if queued[ni] || out[ni] != 0 || mask_raw[ni] == 0 {
                continue;
            }
            let c = cost_raw[ni];
            if !c.is_finite() {
                continue;
            }
            heap.push(FrontPixel {
                cost: c,
                age,
                index: ni,
                label,
            });
            age += 1;
            queued[ni] = true;
        }
    }

    LabelImage::from_raw(w, h, out).expect("dimensions match cost surface")
}
