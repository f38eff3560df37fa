//! Language identification over the closed label-language set.
//!
//! A statistical classifier restricted to the four scripts the system
//! supports produces a raw guess; the identifier stage applies the threshold
//! policy on top. Below-threshold classifications become `unknown` with the
//! raw confidence preserved; the pipeline never substitutes a "most likely"
//! language, it routes `unknown` to the default recognition engine instead.

mod script;

use crate::core::config::LanguageIdConfig;
use crate::core::traits::LanguageClassifier;
use crate::domain::{Language, LanguageGuess};
use lingua::{LanguageDetector, LanguageDetectorBuilder};
use std::sync::Arc;

/// Statistical [`LanguageClassifier`] backed by lingua, restricted to
/// Chinese, English, Japanese, and Korean. Chinese classifications are split
/// into zh-tw/zh-cn by a script census.
pub struct LinguaClassifier {
    detector: LanguageDetector,
}

impl LinguaClassifier {
    /// Builds the classifier. Model data is embedded; this cannot fail.
    pub fn new() -> Self {
        let detector = LanguageDetectorBuilder::from_languages(&[
            lingua::Language::Chinese,
            lingua::Language::English,
            lingua::Language::Japanese,
            lingua::Language::Korean,
        ])
        .build();
        Self { detector }
    }
}

impl Default for LinguaClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LinguaClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinguaClassifier").finish_non_exhaustive()
    }
}

impl LanguageClassifier for LinguaClassifier {
    fn name(&self) -> &str {
        "lingua"
    }

    fn classify(&self, text: &str) -> LanguageGuess {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return LanguageGuess::unknown(0.0);
        }

        let mut values = self.detector.compute_language_confidence_values(trimmed);
        let Some((language, confidence)) = values.drain(..).next() else {
            return LanguageGuess::unknown(0.0);
        };
        let confidence = confidence as f32;

        let language = match language {
            lingua::Language::Chinese => script::chinese_variant(trimmed),
            lingua::Language::English => Language::En,
            lingua::Language::Japanese => Language::Ja,
            lingua::Language::Korean => Language::Ko,
            _ => return LanguageGuess::unknown(confidence),
        };

        LanguageGuess::new(language, confidence)
    }
}

/// The language-identification stage: a classifier plus the threshold policy.
#[derive(Debug, Clone)]
pub struct LanguageIdentifier {
    classifier: Arc<dyn LanguageClassifier>,
    confidence_threshold: f32,
    min_sample_chars: usize,
}

impl LanguageIdentifier {
    /// Creates the stage around a classifier.
    pub fn new(classifier: Arc<dyn LanguageClassifier>, config: &LanguageIdConfig) -> Self {
        Self {
            classifier,
            confidence_threshold: config.confidence_threshold,
            min_sample_chars: config.min_sample_chars,
        }
    }

    /// Identifies the language of a text sample.
    ///
    /// Samples too short to classify reliably, and classifications below the
    /// configured threshold, yield `unknown` with the raw confidence kept.
    pub fn identify(&self, sample: &str) -> LanguageGuess {
        let trimmed = sample.trim();
        if trimmed.chars().count() < self.min_sample_chars {
            return LanguageGuess::unknown(0.0);
        }
        let guess = self.classifier.classify(trimmed);
        if guess.confidence < self.confidence_threshold {
            return LanguageGuess::unknown(guess.confidence);
        }
        guess
    }
}
