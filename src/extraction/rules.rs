//! Matcher rules compiled from the unit vocabulary.
//!
//! Three patterns, applied in a fixed declared order by the engine:
//! a count-unit rule ("20錠", "20 tablets") for the quantity field, a
//! dose-grammar rule (optional name token + number + dose unit,
//! "Acetaminophen 500mg") for the ingredients field, and a bare dose rule
//! used only as the quantity fallback when no count unit appears anywhere.

use crate::core::config::UnitVocabulary;
use crate::core::errors::PipelineError;
use regex::Regex;
use std::collections::HashSet;

/// One pattern hit inside a line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RuleMatch {
    /// Byte offset of the match start in the line.
    pub start: usize,
    /// Byte offset one past the match end.
    pub end: usize,
    /// The matched text with whitespace collapsed.
    pub text: String,
    /// Whether the unit matched a vocabulary entry exactly (vs. a case or
    /// width variant).
    pub exact_unit: bool,
}

/// The rule set compiled for one vocabulary.
#[derive(Debug)]
pub(crate) struct CompiledRules {
    count_rule: Regex,
    dose_rule: Regex,
    ingredient_rule: Regex,
    exact_units: HashSet<String>,
    unit_words: HashSet<String>,
}

impl CompiledRules {
    /// Compiles the rules. Fails only on a vocabulary that produces an
    /// invalid pattern, which validation should have rejected earlier.
    pub fn compile(vocab: &UnitVocabulary) -> Result<Self, PipelineError> {
        let count_alt = alternation(&vocab.count_units);
        let dose_alt = alternation(&vocab.dose_units);

        let count_rule = compile_pattern(&format!(
            r"(?i)(\d+(?:\.\d+)?)\s*({count_alt})"
        ))?;
        let dose_rule = compile_pattern(&format!(
            r"(?i)(\d+(?:\.\d+)?)\s*({dose_alt})"
        ))?;
        let ingredient_rule = compile_pattern(&format!(
            r"(?i)(?:([\p{{L}}][\p{{L}}\p{{M}}'\-]*)\s*)?(\d+(?:\.\d+)?)\s*({dose_alt})"
        ))?;

        let exact_units = vocab
            .count_units
            .iter()
            .chain(vocab.dose_units.iter())
            .cloned()
            .collect();
        let unit_words = vocab
            .count_units
            .iter()
            .chain(vocab.dose_units.iter())
            .map(|u| u.to_lowercase())
            .collect();

        Ok(Self {
            count_rule,
            dose_rule,
            ingredient_rule,
            exact_units,
            unit_words,
        })
    }

    /// First count-unit quantity match in the line, if any.
    pub fn find_quantity_count(&self, line: &str) -> Option<RuleMatch> {
        self.first_match(&self.count_rule, line)
    }

    /// First dose-unit quantity match in the line, if any. Fallback rule.
    pub fn find_quantity_dose(&self, line: &str) -> Option<RuleMatch> {
        self.first_match(&self.dose_rule, line)
    }

    /// All non-overlapping dose-grammar matches in the line, in order.
    pub fn find_ingredients(&self, line: &str) -> Vec<RuleMatch> {
        self.ingredient_rule
            .captures_iter(line)
            .map(|caps| {
                let full = caps.get(0).expect("capture group 0 always exists");
                let unit = caps.get(3).expect("unit group is not optional");
                // A leading token that is itself a unit ("tablets 500mg") is
                // not an ingredient name; shrink the match to number + unit.
                let start = match caps.get(1) {
                    Some(name) if !self.unit_words.contains(&name.as_str().to_lowercase()) => {
                        name.start()
                    }
                    _ => caps.get(2).expect("number group is not optional").start(),
                };
                RuleMatch {
                    start,
                    end: full.end(),
                    text: clean_text(&line[start..full.end()]),
                    exact_unit: self.exact_units.contains(unit.as_str()),
                }
            })
            .collect()
    }

    fn first_match(&self, rule: &Regex, line: &str) -> Option<RuleMatch> {
        rule.captures(line).map(|caps| {
            let full = caps.get(0).expect("capture group 0 always exists");
            let unit = caps.get(2).expect("unit group is not optional");
            RuleMatch {
                start: full.start(),
                end: full.end(),
                text: clean_text(full.as_str()),
                exact_unit: self.exact_units.contains(unit.as_str()),
            }
        })
    }
}

/// Collapses runs of whitespace to single spaces and trims.
pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn compile_pattern(pattern: &str) -> Result<Regex, PipelineError> {
    Regex::new(pattern)
        .map_err(|e| PipelineError::config(format!("invalid extraction pattern: {e}")))
}

/// Longest-first alternation so "mcg" wins over "g" and "毫克" over "克".
fn alternation(units: &[String]) -> String {
    let mut sorted: Vec<&String> = units.iter().collect();
    sorted.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });
    sorted
        .iter()
        .map(|u| regex::escape(u))
        .collect::<Vec<_>>()
        .join("|")
}
