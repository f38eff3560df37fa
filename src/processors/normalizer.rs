//! Image normalization into the canonical pipeline form.

use crate::core::config::NormalizerConfig;
use crate::core::errors::PipelineError;
use image::imageops::FilterType;
use image::{GrayImage, RgbImage};

/// The canonical image form every downstream stage consumes: a bounded RGB
/// copy plus a grayscale copy derived from it.
#[derive(Clone)]
pub struct NormalizedImage {
    /// Color copy, used for recognition crops.
    pub color: RgbImage,
    /// Grayscale copy, used for edge-based detection.
    pub gray: GrayImage,
}

impl NormalizedImage {
    /// Width of the canonical image.
    pub fn width(&self) -> u32 {
        self.color.width()
    }

    /// Height of the canonical image.
    pub fn height(&self) -> u32 {
        self.color.height()
    }
}

impl std::fmt::Debug for NormalizedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedImage")
            .field(
                "color",
                &format_args!("RgbImage({}x{})", self.color.width(), self.color.height()),
            )
            .field(
                "gray",
                &format_args!("GrayImage({}x{})", self.gray.width(), self.gray.height()),
            )
            .finish()
    }
}

/// Pure transform from raw bytes to the canonical image form.
///
/// Normalization is idempotent: the output's longest side never exceeds the
/// configured limit, so re-normalizing a normalized image is the identity.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    max_side_len: u32,
}

impl ImageNormalizer {
    /// Creates a normalizer from its configuration.
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            max_side_len: config.max_side_len,
        }
    }

    /// Decodes and normalizes raw image bytes.
    ///
    /// Bytes that cannot be decoded as a supported image format fail with
    /// [`PipelineError::InvalidImage`].
    pub fn normalize_bytes(&self, bytes: &[u8]) -> Result<NormalizedImage, PipelineError> {
        let decoded = image::load_from_memory(bytes).map_err(|e| {
            PipelineError::invalid_image(format!("undecodable image bytes: {e}"))
        })?;
        Ok(self.normalize(decoded.to_rgb8()))
    }

    /// Normalizes an already decoded image.
    pub fn normalize(&self, image: RgbImage) -> NormalizedImage {
        let color = self.bound_size(image);
        let gray = image::imageops::grayscale(&color);
        NormalizedImage { color, gray }
    }

    fn bound_size(&self, image: RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let longest = width.max(height);
        if longest <= self.max_side_len {
            return image;
        }
        // Scale so the longest side lands exactly on the limit; this is what
        // makes a second normalization a no-op.
        let (new_width, new_height) = if width >= height {
            let scaled = ((u64::from(height) * u64::from(self.max_side_len))
                / u64::from(width)) as u32;
            (self.max_side_len, scaled.max(1))
        } else {
            let scaled = ((u64::from(width) * u64::from(self.max_side_len))
                / u64::from(height)) as u32;
            (scaled.max(1), self.max_side_len)
        };
        image::imageops::resize(&image, new_width, new_height, FilterType::Triangle)
    }
}
