//! Structured drug-label extraction from medicine-box photographs.
//!
//! This crate turns an uploaded packaging photo into a validated structured
//! record (product name, active ingredients, packaging quantity) through a
//! multi-stage pipeline:
//!
//! 1. **Normalization** - decode into a canonical bounded RGB + grayscale form
//! 2. **Region detection** - locate the text-bearing area, with a flagged
//!    whole-image fallback when nothing clears the confidence threshold
//! 3. **Provisional recognition** - a fast language-agnostic text sample
//! 4. **Language identification** - classify the sample over a closed set
//!    (zh-tw, zh-cn, en, ja, ko), demoting weak guesses to `unknown`
//! 5. **Final recognition** - the engine registered for the identified
//!    language, with a default multi-language engine for `unknown`
//! 6. **Extraction** - ordered matcher rules turn the text into the three
//!    fields, each with its own confidence
//!
//! Front and back images of one submission run concurrently and are merged
//! per field, higher confidence winning and the front breaking ties.
//!
//! # Example
//!
//! ```no_run
//! use medbox_ocr::medbox::{MedBoxOcrBuilder, Submission};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = MedBoxOcrBuilder::new().build()?;
//!
//! let front = std::fs::read("front.jpg")?;
//! let back = std::fs::read("back.jpg")?;
//! let outcome = orchestrator
//!     .process(Submission::new(front).with_back(back))
//!     .await?;
//!
//! let response = orchestrator.response(&outcome.record);
//! println!("{}", serde_json::to_string_pretty(&response)?);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod extraction;
pub mod langid;
pub mod medbox;
pub mod processors;
pub mod recognition;
pub mod utils;

pub use crate::core::errors::{PipelineError, PipelineStage, StageFailure};
pub use crate::core::{EngineRegistry, PipelineConfig};
pub use crate::domain::{
    ImageAsset, ImageRole, Language, LanguageGuess, MedicineRecord, RecordResponse, RecordSource,
};
pub use crate::medbox::{MedBoxOcrBuilder, Orchestrator, Submission, SubmissionOutcome};
