//! Engine seams between the orchestrator and the model-backed stages.
//!
//! Each trait covers one blocking model invocation. Implementations must be
//! safe for concurrent use after construction: the registry holds them behind
//! `Arc` and never mutates them, and concurrent image runs call into the same
//! handles.

use crate::core::errors::PipelineError;
use crate::domain::{LanguageGuess, OcrLine, Region};
use crate::processors::NormalizedImage;
use image::RgbImage;

/// Locates text-bearing sub-regions of a normalized image.
pub trait RegionDetector: Send + Sync + std::fmt::Debug {
    /// Stable identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Returns candidate regions, unordered and unthresholded; empty when
    /// nothing was found. Errors mean the detector itself could not run,
    /// which is fatal for the run.
    fn detect(&self, image: &NormalizedImage) -> Result<Vec<Region>, PipelineError>;
}

/// Recognizes text in one region crop.
///
/// The same trait serves both passes: the provisional sampler only needs its
/// output to exist, the final pass feeds extraction.
pub trait TextRecognizer: Send + Sync + std::fmt::Debug {
    /// Stable engine identifier, recorded on every output.
    fn id(&self) -> &str;

    /// Recognizes text lines in the crop. An empty line list is a valid
    /// result; errors mean the engine failed to run.
    fn recognize(&self, image: &RgbImage) -> Result<Vec<OcrLine>, PipelineError>;
}

/// Classifies a text sample into the closed language set.
pub trait LanguageClassifier: Send + Sync + std::fmt::Debug {
    /// Stable identifier used in logs.
    fn name(&self) -> &str;

    /// Raw classification with its confidence. Threshold policy is applied by
    /// the identifier stage, not here.
    fn classify(&self, text: &str) -> LanguageGuess;
}
