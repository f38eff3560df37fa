//! Edge/contour based region proposal.
//!
//! The default region detector: grayscale → Gaussian blur → Canny edges →
//! contour bounding rectangles, with confidence taken from the fraction of
//! the image each rectangle covers. Packaging photographed against a
//! background produces a dominant box-shaped contour; busy backgrounds
//! produce low-confidence noise that the threshold policy discards.

use crate::core::config::DetectionConfig;
use crate::core::errors::PipelineError;
use crate::core::traits::RegionDetector;
use crate::domain::{BoundingBox, Region};
use crate::processors::NormalizedImage;
use imageproc::contours::find_contours;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

/// Contour-based [`RegionDetector`] implementation.
#[derive(Debug, Clone)]
pub struct ContourRegionDetector {
    blur_sigma: f32,
    canny_low: f32,
    canny_high: f32,
    min_area_ratio: f32,
    max_candidates: usize,
}

impl ContourRegionDetector {
    /// Creates a detector from the detection configuration.
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            blur_sigma: 1.4,
            canny_low: 50.0,
            canny_high: 150.0,
            min_area_ratio: config.min_region_area_ratio,
            max_candidates: config.max_regions.max(1) * 4,
        }
    }

    fn bounding_rect(points: &[imageproc::point::Point<i32>]) -> Option<BoundingBox> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) =
            (first.x, first.y, first.x, first.y);
        for point in points {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        let width = (max_x - min_x + 1).max(1) as u32;
        let height = (max_y - min_y + 1).max(1) as u32;
        Some(BoundingBox::new(
            min_x.max(0) as u32,
            min_y.max(0) as u32,
            width,
            height,
        ))
    }
}

impl RegionDetector for ContourRegionDetector {
    fn name(&self) -> &str {
        "contour-detector"
    }

    fn detect(&self, image: &NormalizedImage) -> Result<Vec<Region>, PipelineError> {
        let image_area = u64::from(image.width()) * u64::from(image.height());
        if image_area == 0 {
            return Err(PipelineError::DetectionUnavailable {
                message: "cannot detect regions in a zero-area image".to_string(),
            });
        }

        let blurred = gaussian_blur_f32(&image.gray, self.blur_sigma);
        let edges = canny(&blurred, self.canny_low, self.canny_high);
        let contours = find_contours::<i32>(&edges);

        let mut regions: Vec<Region> = Vec::new();
        for contour in &contours {
            let Some(bbox) = Self::bounding_rect(&contour.points) else {
                continue;
            };
            let bbox = bbox.clamp_to(image.width(), image.height());
            let ratio = bbox.area() as f32 / image_area as f32;
            if ratio < self.min_area_ratio {
                continue;
            }
            regions.push(Region::new(bbox, ratio.min(1.0)));
        }

        // Highest coverage first; ties broken by position for determinism.
        regions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| (a.bbox.y, a.bbox.x).cmp(&(b.bbox.y, b.bbox.x)))
        });

        // A rectangle nested in an already-kept one is the same physical
        // contour traced from the other side; keep the outer box only.
        let mut kept: Vec<Region> = Vec::new();
        for region in regions {
            if kept.iter().any(|k| k.bbox.contains(&region.bbox)) {
                continue;
            }
            kept.push(region);
            if kept.len() >= self.max_candidates {
                break;
            }
        }

        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::NormalizerConfig;
    use crate::processors::ImageNormalizer;
    use image::{Rgb, RgbImage};

    fn detector() -> ContourRegionDetector {
        ContourRegionDetector::new(&DetectionConfig::default())
    }

    fn normalized(image: RgbImage) -> NormalizedImage {
        ImageNormalizer::new(&NormalizerConfig::default()).normalize(image)
    }

    #[test]
    fn uniform_image_has_no_regions() {
        let image = normalized(RgbImage::from_pixel(200, 150, Rgb([128, 128, 128])));
        let regions = detector().detect(&image).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn a_bright_rectangle_is_detected() {
        let mut image = RgbImage::from_pixel(200, 150, Rgb([10, 10, 10]));
        for y in 30..120 {
            for x in 40..170 {
                image.put_pixel(x, y, Rgb([240, 240, 240]));
            }
        }
        let regions = detector().detect(&normalized(image)).unwrap();
        assert!(!regions.is_empty());
        let top = &regions[0];
        assert!(!top.fallback);
        assert!(top.confidence > 0.2, "confidence was {}", top.confidence);
        // The detected box should roughly cover the drawn rectangle.
        assert!(top.bbox.x <= 45 && top.bbox.y <= 35);
        assert!(top.bbox.width >= 120 && top.bbox.height >= 80);
    }

    #[test]
    fn nested_rectangles_keep_the_outer_box() {
        let mut image = RgbImage::from_pixel(200, 200, Rgb([10, 10, 10]));
        for y in 20..180 {
            for x in 20..180 {
                image.put_pixel(x, y, Rgb([240, 240, 240]));
            }
        }
        for y in 60..140 {
            for x in 60..140 {
                image.put_pixel(x, y, Rgb([10, 10, 10]));
            }
        }
        let regions = detector().detect(&normalized(image)).unwrap();
        assert!(!regions.is_empty());
        let outer = &regions[0].bbox;
        for region in &regions[1..] {
            assert!(!outer.contains(&region.bbox));
        }
    }
}
