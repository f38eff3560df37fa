//! Image-level processing: normalization and region proposal.

pub mod contours;
pub mod normalizer;

pub use contours::ContourRegionDetector;
pub use normalizer::{ImageNormalizer, NormalizedImage};
