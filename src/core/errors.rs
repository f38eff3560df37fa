//! Core error types for the recognition pipeline.
//!
//! This module defines the error taxonomy used throughout the system: invalid
//! input, unavailable detection infrastructure, per-region OCR failures, and
//! configuration problems. Stage identifiers let callers report exactly where
//! a run failed.

use thiserror::Error;

/// Stages of a single image's pipeline run.
///
/// Used to name the failing stage when a run terminates early, and to label
/// timeouts on blocking engine invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Decoding and canonicalizing the input image.
    Normalization,
    /// Locating text-bearing regions.
    Detection,
    /// The fast text sampling pass that feeds language identification.
    ProvisionalRecognition,
    /// Classifying the sampled text into a language code.
    LanguageIdentification,
    /// The language-specific recognition pass.
    Recognition,
    /// Rule-based field extraction.
    Extraction,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Normalization => write!(f, "normalization"),
            PipelineStage::Detection => write!(f, "region detection"),
            PipelineStage::ProvisionalRecognition => write!(f, "provisional recognition"),
            PipelineStage::LanguageIdentification => write!(f, "language identification"),
            PipelineStage::Recognition => write!(f, "recognition"),
            PipelineStage::Extraction => write!(f, "extraction"),
        }
    }
}

/// Errors that can occur while running the recognition pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input bytes could not be decoded as a supported image format.
    /// Not retried; reported to the caller immediately.
    #[error("invalid image: {message}")]
    InvalidImage {
        /// What made the input unusable.
        message: String,
    },

    /// The region detector could not run at all. Fatal for the run.
    #[error("region detection unavailable: {message}")]
    DetectionUnavailable {
        /// Why the detector is unavailable.
        message: String,
    },

    /// A recognition engine failed for one region. Scoped to that region;
    /// sibling regions in the same run are unaffected.
    #[error("ocr failed in engine '{engine}': {message}")]
    OcrFailed {
        /// Identifier of the engine that failed.
        engine: String,
        /// Failure details, including any retry outcome.
        message: String,
    },

    /// A blocking engine invocation exceeded its configured timeout.
    /// Treated identically to an engine failure by the retry policy.
    #[error("{stage} timed out after {timeout_ms} ms")]
    Timeout {
        /// The stage whose invocation timed out.
        stage: PipelineStage,
        /// The configured timeout that was exceeded.
        timeout_ms: u64,
    },

    /// A configuration value is missing or out of range.
    #[error("configuration: {message}")]
    Config {
        /// A message describing the configuration error.
        message: String,
    },

    /// An internal runtime failure (worker panic, re-encode error).
    #[error("internal: {message}")]
    Internal {
        /// Failure details.
        message: String,
    },

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for PipelineError {
    /// Decode failures are invalid input by definition.
    fn from(error: image::ImageError) -> Self {
        Self::InvalidImage {
            message: error.to_string(),
        }
    }
}

impl From<crate::core::config::ConfigError> for PipelineError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::Config {
            message: error.to_string(),
        }
    }
}

impl PipelineError {
    /// Creates an invalid-image error.
    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage {
            message: message.into(),
        }
    }

    /// Creates a per-region OCR failure for the named engine.
    pub fn ocr_failed(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OcrFailed {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True when this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A pipeline failure annotated with the stage it occurred in.
///
/// This is what a caller sees when a run terminates: the failing stage is
/// always named, never swallowed into a silent default record.
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct StageFailure {
    /// The stage the run failed in.
    pub stage: PipelineStage,
    /// The underlying error.
    pub error: PipelineError,
}

impl StageFailure {
    /// Creates a stage failure.
    pub fn new(stage: PipelineStage, error: PipelineError) -> Self {
        Self { stage, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display_names() {
        assert_eq!(PipelineStage::Detection.to_string(), "region detection");
        assert_eq!(
            PipelineStage::LanguageIdentification.to_string(),
            "language identification"
        );
    }

    #[test]
    fn image_error_maps_to_invalid_input() {
        let err = image::load_from_memory(b"not an image").unwrap_err();
        let mapped = PipelineError::from(err);
        assert!(matches!(mapped, PipelineError::InvalidImage { .. }));
    }

    #[test]
    fn stage_failure_names_the_stage() {
        let failure = StageFailure::new(
            PipelineStage::Recognition,
            PipelineError::ocr_failed("tesseract:eng", "boom"),
        );
        let rendered = failure.to_string();
        assert!(rendered.starts_with("recognition failed"));
        assert!(rendered.contains("tesseract:eng"));
    }
}
