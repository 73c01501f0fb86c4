//! nucleiseg — pure-Rust segmentation of primary objects (nuclei) in
//! grayscale microscopy images.
//!
//! The pipeline stages are:
//!
//! 1. **Threshold** – compute a global binarization threshold (Otsu or
//!    manual) over the masked pixels.
//! 2. **Binarize** – lightly blur, compare against the threshold field, label
//!    connected foreground and fill enclosed holes.
//! 3. **Unclump** – place one seed per candidate object inside each blob
//!    (intensity, shape, or Laplacian-of-Gaussian maxima) and re-draw the
//!    boundaries between touching objects with a seeded watershed.
//! 4. **Filter** – discard objects touching the border and objects outside
//!    the configured diameter range, then compact the surviving ids.
//!
//! # Public API
//! - [`segment`] with [`SegmentConfig`] and a [`Thresholder`] as the primary
//!   entry point
//! - [`MaskedImage`] as the input type; [`SegmentationResult`] and
//!   [`SummaryStats`] as outputs
//! - [`UnclumpConfig`] for tuning how touching objects are separated
//!
//! Low-level filtering and label-map primitives are exposed for reuse but are
//! not part of the stable surface.

pub mod labels;
pub mod log_filter;
pub mod maxima;
pub mod smooth;
pub mod watershed;

mod error;
mod masked_image;
mod pipeline;
mod threshold;
mod unclump;

#[cfg(test)]
mod test_utils;

pub use error::ConfigError;
pub use masked_image::{BinaryImage, GrayF32Image, LabelImage, MaskedImage};
pub use pipeline::{segment, SegmentConfig, SegmentationResult, SummaryStats};
pub use threshold::{GlobalOtsu, ManualThreshold, Thresholder};
pub use unclump::{DividingLineMethod, UnclumpConfig, UnclumpMethod};
