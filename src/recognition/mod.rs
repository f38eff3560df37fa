//! Recognition engine implementations.

pub mod tesseract;

pub use tesseract::{
    tesseract_lang, TesseractRecognizer, DEFAULT_LANG_STACK, PROVISIONAL_LANG_STACK,
};
