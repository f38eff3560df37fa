//! Detected regions and their bounding boxes.

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl BoundingBox {
    /// Creates a bounding box.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A box covering an entire image of the given dimensions.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Area in pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Clamps the box to fit inside an image of the given dimensions.
    /// Degenerate boxes are widened to at least one pixel where possible.
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> Self {
        let x = self.x.min(image_width.saturating_sub(1));
        let y = self.y.min(image_height.saturating_sub(1));
        let width = self.width.clamp(1, image_width.saturating_sub(x).max(1));
        let height = self.height.clamp(1, image_height.saturating_sub(y).max(1));
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when `other` lies entirely inside this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }
}

/// A detected sub-area of an image believed to contain label text.
///
/// Regions never outlive the pipeline run that produced them; the run owns
/// both the image and its region set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Location of the region in the normalized image.
    pub bbox: BoundingBox,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
    /// True for the whole-image stand-in emitted when no candidate cleared
    /// the detection threshold. Callers should discount results accordingly.
    pub fallback: bool,
}

impl Region {
    /// Creates a detected region.
    pub fn new(bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            bbox,
            confidence,
            fallback: false,
        }
    }

    /// The flagged whole-image fallback region, confidence zero.
    pub fn whole_image(image_width: u32, image_height: u32) -> Self {
        Self {
            bbox: BoundingBox::full(image_width, image_height),
            confidence: 0.0,
            fallback: true,
        }
    }

    /// Crops this region out of an image, clamping to the image bounds.
    pub fn crop(&self, image: &RgbImage) -> RgbImage {
        let bbox = self.bbox.clamp_to(image.width(), image.height());
        image::imageops::crop_imm(image, bbox.x, bbox.y, bbox.width, bbox.height).to_image()
    }
}
