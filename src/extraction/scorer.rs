//! Heuristic ranking of medicine-name candidates.
//!
//! Whatever text survives the quantity and ingredient matchers competes to be
//! the product name. Labels put the name near the top in large type, so the
//! scorer favors early lines, rewards content-bearing length and letter
//! density, and gives Latin titlecase a small nudge.

use crate::extraction::rules::clean_text;
use std::collections::HashSet;

/// Scores and filters name candidates.
#[derive(Debug)]
pub(crate) struct NameScorer {
    ascii_keys: HashSet<String>,
    cjk_keys: Vec<String>,
}

impl NameScorer {
    /// Creates a scorer over a stoplist of section keywords.
    pub fn new(stoplist: &[String]) -> Self {
        let mut ascii_keys = HashSet::new();
        let mut cjk_keys = Vec::new();
        for key in stoplist {
            if key.is_ascii() {
                ascii_keys.insert(key.to_lowercase());
            } else {
                cjk_keys.push(key.clone());
            }
        }
        Self {
            ascii_keys,
            cjk_keys,
        }
    }

    /// Strips stoplist keywords and separator punctuation from a residual
    /// line. Returns `None` when nothing content-bearing remains, which
    /// disqualifies the line as a name candidate.
    pub fn prepare(&self, residual: &str) -> Option<String> {
        let mut text = clean_text(residual);
        for key in &self.cjk_keys {
            if text.contains(key.as_str()) {
                text = text.replace(key.as_str(), " ");
            }
        }
        let kept: Vec<&str> = text
            .split_whitespace()
            .filter(|token| {
                let bare = token
                    .trim_matches(|c: char| c.is_ascii_punctuation())
                    .to_lowercase();
                bare.is_empty() || !self.ascii_keys.contains(&bare)
            })
            .collect();
        let joined = kept.join(" ");
        let trimmed = joined
            .trim_matches(|c: char| {
                c.is_whitespace() || c.is_ascii_punctuation() || "：、。・，；「」（）".contains(c)
            })
            .to_string();
        if trimmed.chars().count() < 2 {
            return None;
        }
        Some(trimmed)
    }

    /// Normalized score in [0, 1] for a prepared candidate.
    ///
    /// `rank` is the candidate's position among accepted candidates, not its
    /// raw line index: the first surviving line is the strongest prior.
    pub fn score(&self, text: &str, rank: usize) -> f32 {
        let position = 1.0 / (1.0 + rank as f32 * 0.5);

        let char_count = text.chars().count();
        let length = (char_count as f32 / 12.0).min(1.0);

        let non_space = text.chars().filter(|c| !c.is_whitespace()).count();
        let letters = text.chars().filter(|c| c.is_alphabetic()).count();
        let density = if non_space == 0 {
            0.0
        } else {
            letters as f32 / non_space as f32
        };

        let capital_bonus = match text.chars().next() {
            Some(c) if c.is_ascii_uppercase() => 1.1,
            _ => 1.0,
        };

        (position * (0.4 * length + 0.6 * density) * capital_bonus).clamp(0.0, 1.0)
    }
}
