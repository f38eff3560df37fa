//! The closed set of supported label languages.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Language codes a label can be classified into.
///
/// The set is closed: engines, vocabulary, and the final-engine registry are
/// all keyed on these variants. `Unknown` is a first-class value that routes
/// recognition to the configured default engine rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Traditional Chinese.
    #[serde(rename = "zh-tw")]
    ZhTw,
    /// Simplified Chinese.
    #[serde(rename = "zh-cn")]
    ZhCn,
    /// English.
    #[serde(rename = "en")]
    En,
    /// Japanese.
    #[serde(rename = "ja")]
    Ja,
    /// Korean.
    #[serde(rename = "ko")]
    Ko,
    /// Classification was below threshold or impossible.
    #[serde(rename = "unknown")]
    Unknown,
}

impl Language {
    /// The identifiable languages, excluding `Unknown`.
    pub const SUPPORTED: [Language; 5] = [
        Language::ZhTw,
        Language::ZhCn,
        Language::En,
        Language::Ja,
        Language::Ko,
    ];

    /// The wire code for this language.
    pub fn code(&self) -> &'static str {
        match self {
            Language::ZhTw => "zh-tw",
            Language::ZhCn => "zh-cn",
            Language::En => "en",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Unknown => "unknown",
        }
    }

    /// True for every variant except `Unknown`.
    pub fn is_known(&self) -> bool {
        !matches!(self, Language::Unknown)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zh-tw" => Ok(Language::ZhTw),
            "zh-cn" => Ok(Language::ZhCn),
            "en" => Ok(Language::En),
            "ja" => Ok(Language::Ja),
            "ko" => Ok(Language::Ko),
            "unknown" => Ok(Language::Unknown),
            other => Err(format!("unsupported language code '{other}'")),
        }
    }
}

/// A language classification with its confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LanguageGuess {
    /// The classified language.
    pub language: Language,
    /// Classifier confidence in [0, 1]. Preserved even when the guess is
    /// demoted to `Unknown` by the threshold policy.
    pub confidence: f32,
}

impl LanguageGuess {
    /// Creates a guess.
    pub fn new(language: Language, confidence: f32) -> Self {
        Self {
            language,
            confidence,
        }
    }

    /// An `Unknown` guess carrying the raw classifier confidence.
    pub fn unknown(confidence: f32) -> Self {
        Self::new(Language::Unknown, confidence)
    }
}
