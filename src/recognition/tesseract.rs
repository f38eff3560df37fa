//! Tesseract-backed text recognition.

use crate::core::errors::PipelineError;
use crate::core::traits::TextRecognizer;
use crate::domain::{Language, OcrLine};
use image::RgbImage;
use leptess::{LepTess, Variable};
use std::path::{Path, PathBuf};

/// The Tesseract language stack served to `unknown` and unregistered
/// languages; matches the sampler's multi-script coverage.
pub const DEFAULT_LANG_STACK: &str = "eng+chi_tra";

/// The fast language-agnostic stack used by the provisional sampling pass.
pub const PROVISIONAL_LANG_STACK: &str = "eng";

/// Tesseract traineddata name for a supported language, `None` for `Unknown`.
pub fn tesseract_lang(language: Language) -> Option<&'static str> {
    match language {
        Language::ZhTw => Some("chi_tra"),
        Language::ZhCn => Some("chi_sim"),
        Language::En => Some("eng"),
        Language::Ja => Some("jpn"),
        Language::Ko => Some("kor"),
        Language::Unknown => None,
    }
}

/// A [`TextRecognizer`] over one Tesseract language configuration.
///
/// The struct holds configuration only; a fresh Tesseract session is created
/// per invocation, so a shared handle is safe for concurrent runs without
/// locking. Construction probes the traineddata once so a missing language
/// pack surfaces at startup rather than mid-run.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    id: String,
    lang: String,
    datapath: Option<PathBuf>,
    page_seg_mode: u32,
}

impl TesseractRecognizer {
    /// Creates a recognizer for a Tesseract language stack such as `"eng"` or
    /// `"eng+chi_tra"`, probing the traineddata.
    pub fn new(lang: &str, datapath: Option<&Path>) -> Result<Self, PipelineError> {
        let recognizer = Self {
            id: format!("tesseract:{lang}"),
            lang: lang.to_string(),
            datapath: datapath.map(Path::to_path_buf),
            // Assume a single uniform block of text, as packaging labels are.
            page_seg_mode: 6,
        };
        recognizer.session()?;
        Ok(recognizer)
    }

    /// Overrides the Tesseract page segmentation mode.
    pub fn with_page_seg_mode(mut self, mode: u32) -> Self {
        self.page_seg_mode = mode;
        self
    }

    /// The Tesseract language stack this engine runs with.
    pub fn lang(&self) -> &str {
        &self.lang
    }

    fn session(&self) -> Result<LepTess, PipelineError> {
        let datapath = match &self.datapath {
            Some(path) => Some(path.to_str().ok_or_else(|| {
                PipelineError::config(format!(
                    "tessdata path is not valid UTF-8: {}",
                    path.display()
                ))
            })?),
            None => None,
        };
        let mut session = LepTess::new(datapath, &self.lang).map_err(|e| {
            PipelineError::ocr_failed(&self.id, format!("engine init failed: {e}"))
        })?;
        session
            .set_variable(Variable::TesseditPagesegMode, &self.page_seg_mode.to_string())
            .map_err(|e| {
                PipelineError::ocr_failed(&self.id, format!("cannot set page mode: {e}"))
            })?;
        Ok(session)
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn id(&self) -> &str {
        &self.id
    }

    fn recognize(&self, image: &RgbImage) -> Result<Vec<OcrLine>, PipelineError> {
        let mut session = self.session()?;
        let png = crate::utils::encode_png(image)?;
        session.set_image_from_mem(&png).map_err(|e| {
            PipelineError::ocr_failed(&self.id, format!("cannot set image: {e}"))
        })?;
        let text = session.get_utf8_text().map_err(|e| {
            PipelineError::ocr_failed(&self.id, format!("recognition failed: {e}"))
        })?;
        // Tesseract reports mean confidence per page as a 0-100 integer.
        let confidence = session.mean_text_conf().clamp(0, 100) as f32 / 100.0;

        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| OcrLine::new(line, confidence))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_language_has_a_traineddata_name() {
        for language in Language::SUPPORTED {
            assert!(tesseract_lang(language).is_some(), "{language} unmapped");
        }
        assert!(tesseract_lang(Language::Unknown).is_none());
    }

    #[test]
    fn traineddata_names_match_the_tesseract_convention() {
        assert_eq!(tesseract_lang(Language::ZhTw), Some("chi_tra"));
        assert_eq!(tesseract_lang(Language::ZhCn), Some("chi_sim"));
        assert_eq!(tesseract_lang(Language::Ja), Some("jpn"));
    }
}
