use crate::error::ConfigError;
use crate::unclump::UnclumpConfig;

/// Top-level segmentation parameters.
///
/// Diameters are in pixels and bound the objects the pipeline keeps:
/// the size filter converts them to circle areas, the unclumping stage
/// derives its smoothing and suppression defaults from the minimum.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Smallest accepted object diameter in pixels.
    pub min_diameter: f32,
    /// Largest accepted object diameter in pixels.
    pub max_diameter: f32,
    /// Discard objects outside the diameter range.
    pub discard_size: bool,
    /// Discard objects touching the image border (or the mask edge when a
    /// mask is present and nothing touches the hard border).
    pub discard_border: bool,
    /// Fill enclosed background holes, both before unclumping and after the
    /// exclusion filters.
    pub fill_holes: bool,
    /// Seed finding and dividing-line parameters.
    pub unclump: UnclumpConfig,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            min_diameter: 10.0,
            max_diameter: 40.0,
            discard_size: true,
            discard_border: true,
            fill_holes: true,
            unclump: UnclumpConfig::default(),
        }
    }
}

impl SegmentConfig {
    /// Reject out-of-range or non-finite settings before any pixels are
    /// touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_diameter.is_finite() {
            return Err(ConfigError::NonFiniteSetting("min_diameter"));
        }
        if !self.max_diameter.is_finite() {
            return Err(ConfigError::NonFiniteSetting("max_diameter"));
        }
        if self.min_diameter < 1.0 {
            return Err(ConfigError::MinDiameterTooSmall(self.min_diameter));
        }
        if self.max_diameter < self.min_diameter {
            return Err(ConfigError::DiameterRangeInverted {
                min: self.min_diameter,
                max: self.max_diameter,
            });
        }
        if let Some(v) = self.unclump.smoothing_filter_size {
            if !v.is_finite() {
                return Err(ConfigError::NonFiniteSetting("smoothing_filter_size"));
            }
        }
        if let Some(v) = self.unclump.maxima_suppression_size {
            if !v.is_finite() {
                return Err(ConfigError::NonFiniteSetting("maxima_suppression_size"));
            }
        }
        if let Some(v) = self.unclump.log_threshold {
            if !v.is_finite() {
                return Err(ConfigError::NonFiniteSetting("log_threshold"));
            }
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::LogThresholdOutOfRange(v));
            }
        }
        if let Some(v) = self.unclump.log_diameter {
            if !v.is_finite() {
                return Err(ConfigError::NonFiniteSetting("log_diameter"));
            }
            if !(1.0..=100.0).contains(&v) {
                return Err(ConfigError::LogDiameterOutOfRange(v));
            }
        }
        Ok(())
    }

    /// Smoothing filter size the pipeline will actually use.
    pub fn effective_smoothing_filter_size(&self) -> f32 {
        self.unclump.effective_filter_size(self.min_diameter)
    }
}
