//! Read-only registry of engine handles.
//!
//! Built once at startup and passed into the orchestrator; after construction
//! it is never mutated, so concurrent image runs share it without locking.
//! Final-engine selection is a pure function over the closed language set
//! with one reserved default entry.

use crate::core::errors::PipelineError;
use crate::core::traits::{LanguageClassifier, RegionDetector, TextRecognizer};
use crate::domain::{Language, LanguageGuess};
use std::collections::HashMap;
use std::sync::Arc;

/// The pool of loaded engine handles for one pipeline.
#[derive(Debug)]
pub struct EngineRegistry {
    detector: Arc<dyn RegionDetector>,
    classifier: Arc<dyn LanguageClassifier>,
    provisional: Arc<dyn TextRecognizer>,
    final_engines: HashMap<Language, Arc<dyn TextRecognizer>>,
    default_engine: Arc<dyn TextRecognizer>,
}

impl EngineRegistry {
    /// Creates a registry with the required engines and no per-language
    /// final engines yet.
    pub fn new(
        detector: Arc<dyn RegionDetector>,
        classifier: Arc<dyn LanguageClassifier>,
        provisional: Arc<dyn TextRecognizer>,
        default_engine: Arc<dyn TextRecognizer>,
    ) -> Self {
        Self {
            detector,
            classifier,
            provisional,
            final_engines: HashMap::new(),
            default_engine,
        }
    }

    /// Registers the final engine for one language.
    ///
    /// `Unknown` cannot carry a dedicated engine; it is served by the default.
    pub fn register_final_engine(
        &mut self,
        language: Language,
        engine: Arc<dyn TextRecognizer>,
    ) -> Result<(), PipelineError> {
        if !language.is_known() {
            return Err(PipelineError::config(
                "the 'unknown' language is reserved for the default engine",
            ));
        }
        self.final_engines.insert(language, engine);
        Ok(())
    }

    /// The region detector.
    pub fn detector(&self) -> &Arc<dyn RegionDetector> {
        &self.detector
    }

    /// The language classifier.
    pub fn classifier(&self) -> &Arc<dyn LanguageClassifier> {
        &self.classifier
    }

    /// The provisional (sampling) recognition engine.
    pub fn provisional(&self) -> &Arc<dyn TextRecognizer> {
        &self.provisional
    }

    /// The default multi-language recognition engine.
    pub fn default_engine(&self) -> &Arc<dyn TextRecognizer> {
        &self.default_engine
    }

    /// Selection rule for the final recognition pass: the engine registered
    /// for the guessed language, or the default when the guess is `unknown`
    /// or no engine is registered for it. Pure; involves no model calls.
    pub fn select_final_engine(&self, guess: &LanguageGuess) -> &Arc<dyn TextRecognizer> {
        if !guess.language.is_known() {
            return &self.default_engine;
        }
        self.final_engines
            .get(&guess.language)
            .unwrap_or(&self.default_engine)
    }

    /// Languages with a dedicated final engine, sorted by code.
    pub fn registered_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.final_engines.keys().copied().collect();
        languages.sort_by_key(|l| l.code());
        languages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OcrLine, Region};
    use crate::processors::NormalizedImage;

    #[derive(Debug)]
    struct NamedEngine(&'static str);

    impl TextRecognizer for NamedEngine {
        fn id(&self) -> &str {
            self.0
        }

        fn recognize(&self, _image: &image::RgbImage) -> Result<Vec<OcrLine>, PipelineError> {
            Ok(Vec::new())
        }
    }

    #[derive(Debug)]
    struct NoopDetector;

    impl RegionDetector for NoopDetector {
        fn name(&self) -> &str {
            "noop"
        }

        fn detect(&self, _image: &NormalizedImage) -> Result<Vec<Region>, PipelineError> {
            Ok(Vec::new())
        }
    }

    #[derive(Debug)]
    struct NoopClassifier;

    impl LanguageClassifier for NoopClassifier {
        fn name(&self) -> &str {
            "noop"
        }

        fn classify(&self, _text: &str) -> LanguageGuess {
            LanguageGuess::unknown(0.0)
        }
    }

    fn registry() -> EngineRegistry {
        EngineRegistry::new(
            Arc::new(NoopDetector),
            Arc::new(NoopClassifier),
            Arc::new(NamedEngine("provisional")),
            Arc::new(NamedEngine("default")),
        )
    }

    #[test]
    fn unknown_selects_the_default_engine() {
        let registry = registry();
        let guess = LanguageGuess::unknown(0.2);
        assert_eq!(registry.select_final_engine(&guess).id(), "default");
    }

    #[test]
    fn registered_language_selects_its_engine() {
        let mut registry = registry();
        registry
            .register_final_engine(Language::Ja, Arc::new(NamedEngine("jpn")))
            .unwrap();
        let guess = LanguageGuess::new(Language::Ja, 0.9);
        assert_eq!(registry.select_final_engine(&guess).id(), "jpn");
    }

    #[test]
    fn unregistered_language_falls_back_to_the_default() {
        let registry = registry();
        let guess = LanguageGuess::new(Language::Ko, 0.9);
        assert_eq!(registry.select_final_engine(&guess).id(), "default");
    }

    #[test]
    fn unknown_cannot_be_registered() {
        let mut registry = registry();
        let result =
            registry.register_final_engine(Language::Unknown, Arc::new(NamedEngine("x")));
        assert!(result.is_err());
    }

    #[test]
    fn registered_languages_are_sorted() {
        let mut registry = registry();
        registry
            .register_final_engine(Language::Ko, Arc::new(NamedEngine("kor")))
            .unwrap();
        registry
            .register_final_engine(Language::En, Arc::new(NamedEngine("eng")))
            .unwrap();
        assert_eq!(
            registry.registered_languages(),
            vec![Language::En, Language::Ko]
        );
    }
}
