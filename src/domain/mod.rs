//! The pipeline data model.
//!
//! Everything a run owns or produces lives here: input assets, detected
//! regions, recognition outputs, language guesses, and the final record.

pub mod asset;
pub mod language;
pub mod ocr;
pub mod record;
pub mod region;

pub use asset::{ImageAsset, ImageRole};
pub use language::{Language, LanguageGuess};
pub use ocr::{OcrLine, OcrOutput};
pub use record::{
    ExtractedField, FieldName, FieldValue, MedicineRecord, OcrRef, RecordResponse, RecordSource,
};
pub use region::{BoundingBox, Region};
