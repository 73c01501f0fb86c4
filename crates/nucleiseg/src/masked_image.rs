//! Grayscale image + optional validity mask.
//!
//! Intensities live in `[0, 1]` as `f32`. The mask marks usable pixels;
//! an absent mask means every pixel is valid. Label maps are `u32` images
//! where 0 is background and positive values identify objects.

use image::{GrayImage, ImageBuffer, Luma};

use crate::error::ConfigError;

/// Scalar field: `f32` intensities, distances or filter responses.
pub type GrayF32Image = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Label map: 0 = background, positive = object id.
pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Binary image: 0 = false, nonzero = true.
pub type BinaryImage = ImageBuffer<Luma<u8>, Vec<u8>>;

/// A grayscale intensity image paired with an optional validity mask.
///
/// The pipeline never mutates a `MaskedImage`; every stage produces fresh
/// output arrays.
#[derive(Debug, Clone)]
pub struct MaskedImage {
    pixels: GrayF32Image,
    mask: Option<BinaryImage>,
}

impl MaskedImage {
    /// Wrap an image with every pixel valid.
    pub fn new(pixels: GrayF32Image) -> Self {
        Self { pixels, mask: None }
    }

    /// Wrap an image with a validity mask of identical dimensions.
    pub fn with_mask(pixels: GrayF32Image, mask: BinaryImage) -> Result<Self, ConfigError> {
        if pixels.dimensions() != mask.dimensions() {
            let (image_w, image_h) = pixels.dimensions();
            let (mask_w, mask_h) = mask.dimensions();
            return Err(ConfigError::MaskShapeMismatch {
                image_w,
                image_h,
                mask_w,
                mask_h,
            });
        }
        Ok(Self {
            pixels,
            mask: Some(mask),
        })
    }

    /// Convert an 8-bit grayscale image to the `[0, 1]` float range.
    pub fn from_gray8(gray: &GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let data: Vec<f32> = gray.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
        let pixels = GrayF32Image::from_raw(w, h, data).expect("dimensions match source image");
        Self::new(pixels)
    }

    pub fn pixels(&self) -> &GrayF32Image {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// The explicit validity mask, if one was supplied.
    pub fn mask(&self) -> Option<&BinaryImage> {
        self.mask.as_ref()
    }

    /// Materialize the mask as a 0/1 image (all ones when absent).
    pub fn mask_or_full(&self) -> BinaryImage {
        let (w, h) = self.dimensions();
        match &self.mask {
            Some(m) => {
                let data: Vec<u8> = m.as_raw().iter().map(|&v| u8::from(v != 0)).collect();
                BinaryImage::from_raw(w, h, data).expect("mask dimensions verified at construction")
            }
            None => BinaryImage::from_pixel(w, h, Luma([1u8])),
        }
    }
}
