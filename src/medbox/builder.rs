//! Fluent construction of the recognition pipeline.
//!
//! Wires the default engines (contour detection, Tesseract recognition,
//! lingua language classification) into an [`EngineRegistry`] and returns a
//! ready [`Orchestrator`]. Tests and embedders that bring their own engines
//! can build a registry directly and skip this builder.

use crate::core::config::PipelineConfig;
use crate::core::errors::PipelineError;
use crate::core::registry::EngineRegistry;
use crate::domain::Language;
use crate::langid::LinguaClassifier;
use crate::medbox::orchestrator::Orchestrator;
use crate::processors::ContourRegionDetector;
use crate::recognition::{
    tesseract_lang, TesseractRecognizer, DEFAULT_LANG_STACK, PROVISIONAL_LANG_STACK,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Builder for the standard pipeline.
///
/// # Example
///
/// ```no_run
/// use medbox_ocr::medbox::MedBoxOcrBuilder;
///
/// let orchestrator = MedBoxOcrBuilder::new()
///     .tessdata_dir("/usr/share/tesseract-ocr/5/tessdata")
///     .detection_threshold(0.15)
///     .build()
///     .expect("failed to build pipeline");
/// ```
#[derive(Debug)]
pub struct MedBoxOcrBuilder {
    tessdata_dir: Option<PathBuf>,
    engine_overrides: HashMap<Language, String>,
    default_engine_langs: String,
    provisional_engine_langs: String,
    strict_languages: bool,
    config: PipelineConfig,
}

impl MedBoxOcrBuilder {
    /// Creates a builder with default engines and configuration.
    pub fn new() -> Self {
        Self {
            tessdata_dir: None,
            engine_overrides: HashMap::new(),
            default_engine_langs: DEFAULT_LANG_STACK.to_string(),
            provisional_engine_langs: PROVISIONAL_LANG_STACK.to_string(),
            strict_languages: false,
            config: PipelineConfig::default(),
        }
    }

    /// Sets the Tesseract data directory. When unset, Tesseract's own
    /// default search path applies.
    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tessdata_dir = Some(dir.into());
        self
    }

    /// Overrides the Tesseract language stack used for one label language.
    pub fn language_engine(mut self, language: Language, stack: impl Into<String>) -> Self {
        self.engine_overrides.insert(language, stack.into());
        self
    }

    /// Overrides the default (unknown-language) engine stack.
    pub fn default_engine(mut self, stack: impl Into<String>) -> Self {
        self.default_engine_langs = stack.into();
        self
    }

    /// Overrides the provisional sampling engine stack.
    pub fn provisional_engine(mut self, stack: impl Into<String>) -> Self {
        self.provisional_engine_langs = stack.into();
        self
    }

    /// When set, a language whose traineddata is missing fails the build
    /// instead of being served by the default engine.
    pub fn strict_languages(mut self, strict: bool) -> Self {
        self.strict_languages = strict;
        self
    }

    /// Replaces the entire pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the region detection confidence threshold.
    pub fn detection_threshold(mut self, threshold: f32) -> Self {
        self.config.detection.confidence_threshold = threshold;
        self
    }

    /// Sets the language identification confidence threshold.
    pub fn language_threshold(mut self, threshold: f32) -> Self {
        self.config.language_id.confidence_threshold = threshold;
        self
    }

    /// Builds the orchestrator, probing every engine's model data.
    pub fn build(self) -> Result<Orchestrator, PipelineError> {
        self.config.validate()?;
        let datapath = self.tessdata_dir.as_deref();

        let detector = Arc::new(ContourRegionDetector::new(&self.config.detection));
        let classifier = Arc::new(LinguaClassifier::new());
        let provisional = Arc::new(TesseractRecognizer::new(
            &self.provisional_engine_langs,
            datapath,
        )?);
        let default_engine = Arc::new(TesseractRecognizer::new(
            &self.default_engine_langs,
            datapath,
        )?);

        let mut registry = EngineRegistry::new(detector, classifier, provisional, default_engine);
        for language in Language::SUPPORTED {
            let stack = match self.engine_overrides.get(&language) {
                Some(stack) => stack.clone(),
                None => tesseract_lang(language)
                    .unwrap_or(DEFAULT_LANG_STACK)
                    .to_string(),
            };
            match TesseractRecognizer::new(&stack, datapath) {
                Ok(engine) => registry.register_final_engine(language, Arc::new(engine))?,
                Err(err) if !self.strict_languages => {
                    warn!(
                        %language,
                        stack,
                        error = %err,
                        "language engine unavailable; the default engine will serve it"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Orchestrator::new(registry, self.config)
    }
}

impl Default for MedBoxOcrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_engine_stacks() {
        let builder = MedBoxOcrBuilder::new();
        assert_eq!(builder.default_engine_langs, "eng+chi_tra");
        assert_eq!(builder.provisional_engine_langs, "eng");
        assert!(builder.tessdata_dir.is_none());
        assert!(!builder.strict_languages);
    }

    #[test]
    fn fluent_overrides_are_recorded() {
        let builder = MedBoxOcrBuilder::new()
            .tessdata_dir("/opt/tessdata")
            .language_engine(Language::Ja, "jpn+jpn_vert")
            .default_engine("eng")
            .strict_languages(true)
            .detection_threshold(0.25)
            .language_threshold(0.7);

        assert_eq!(builder.tessdata_dir.as_deref().unwrap().to_str(), Some("/opt/tessdata"));
        assert_eq!(
            builder.engine_overrides.get(&Language::Ja).map(String::as_str),
            Some("jpn+jpn_vert")
        );
        assert_eq!(builder.default_engine_langs, "eng");
        assert!(builder.strict_languages);
        assert_eq!(builder.config.detection.confidence_threshold, 0.25);
        assert_eq!(builder.config.language_id.confidence_threshold, 0.7);
    }
}
