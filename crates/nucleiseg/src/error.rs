//! Error types for the segmentation pipeline.
//!
//! Configuration errors are fatal and raised synchronously before any image
//! data is touched. Degenerate inputs (empty foreground, zero objects) are
//! not errors: every stage passes them through and produces an empty result.

/// A rejected configuration or input-shape mismatch.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Minimum object diameter below the supported floor.
    #[error("minimum object diameter must be >= 1 pixel (got {0})")]
    MinDiameterTooSmall(f32),

    /// Diameter range inverted.
    #[error("maximum object diameter ({max}) is smaller than minimum ({min})")]
    DiameterRangeInverted { min: f32, max: f32 },

    /// A numeric setting that must be finite was NaN or infinite.
    #[error("setting `{0}` must be finite")]
    NonFiniteSetting(&'static str),

    /// Manual LoG threshold outside [0, 1].
    #[error("manual LoG threshold must lie in [0, 1] (got {0})")]
    LogThresholdOutOfRange(f32),

    /// Manual LoG filter diameter outside the supported range.
    #[error("LoG filter diameter must lie in [1, 100] (got {0})")]
    LogDiameterOutOfRange(f32),

    /// Validity mask dimensions differ from the image dimensions.
    #[error("mask dimensions {mask_w}x{mask_h} do not match image dimensions {image_w}x{image_h}")]
    MaskShapeMismatch {
        image_w: u32,
        image_h: u32,
        mask_w: u32,
        mask_h: u32,
    },
}
