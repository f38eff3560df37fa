//! Rule- and pattern-based information extraction.
//!
//! Converts recognized label text into the three structured fields: the
//! packaging quantity, the active ingredients, and the product name.

pub mod engine;
pub(crate) mod rules;
pub(crate) mod scorer;

pub use engine::{ExtractedFieldSet, ExtractionEngine};
