//! Recognized text outputs.

use serde::{Deserialize, Serialize};

/// One recognized text line with its confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    /// The recognized text.
    pub text: String,
    /// Recognition confidence in [0, 1].
    pub confidence: f32,
}

impl OcrLine {
    /// Creates a line.
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// The output of one recognition pass over one region.
///
/// A region produces at most one provisional and one final output per run.
/// Empty text is a valid, low-information result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrOutput {
    /// Identifier of the engine that produced this output.
    pub engine: String,
    /// Index of the source region within the run's region list.
    pub region_index: usize,
    /// Recognized lines in reading order.
    pub lines: Vec<OcrLine>,
}

impl OcrOutput {
    /// Creates an output.
    pub fn new(engine: impl Into<String>, region_index: usize, lines: Vec<OcrLine>) -> Self {
        Self {
            engine: engine.into(),
            region_index,
            lines,
        }
    }

    /// An output with no recognized text.
    pub fn empty(engine: impl Into<String>, region_index: usize) -> Self {
        Self::new(engine, region_index, Vec::new())
    }

    /// True when no line carries non-whitespace text.
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.text.trim().is_empty())
    }

    /// All lines joined with newlines.
    pub fn concatenated_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// A bounded text sample for language identification.
    pub fn sample_text(&self, max_chars: usize) -> String {
        let text = self.concatenated_text();
        if text.chars().count() <= max_chars {
            return text;
        }
        text.chars().take(max_chars).collect()
    }
}
