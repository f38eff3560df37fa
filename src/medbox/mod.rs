//! High-level pipeline assembly and orchestration.
//!
//! This module provides the builder API for constructing the recognition
//! pipeline and the orchestrator that runs it end to end.
//!
//! # Main APIs
//!
//! - [`MedBoxOcrBuilder`] - wires the default engines into a pipeline
//! - [`Orchestrator`] - processes submissions into medicine records

pub mod builder;
pub mod merge;
pub mod orchestrator;

pub use builder::MedBoxOcrBuilder;
pub use merge::merge_records;
pub use orchestrator::{
    ImageRunOutcome, Orchestrator, RunState, Submission, SubmissionOutcome,
};
