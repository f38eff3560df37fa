//! Rule-first extraction of structured fields from recognized text.
//!
//! Rules run in a fixed declared order over the flattened line sequence:
//! quantity (count units, with a dose-unit fallback), then ingredients (the
//! dose grammar), then the medicine name from whatever text neither rule
//! consumed. Ambiguity degrades to low-confidence fields; extraction itself
//! never fails, and all three fields are always present in the result.

use crate::core::config::ExtractionConfig;
use crate::core::errors::PipelineError;
use crate::domain::{ExtractedField, FieldName, FieldValue, OcrOutput, OcrRef};
use crate::extraction::rules::{CompiledRules, RuleMatch};
use crate::extraction::scorer::NameScorer;

/// The three extracted fields of one image's text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFieldSet {
    /// The product name field.
    pub medicine_name: ExtractedField,
    /// The ingredients field.
    pub ingredients: ExtractedField,
    /// The quantity field.
    pub quantity: ExtractedField,
}

struct FlatLine<'a> {
    region_index: usize,
    engine: &'a str,
    text: &'a str,
    confidence: f32,
}

/// The extraction engine, compiled once from its configuration.
#[derive(Debug)]
pub struct ExtractionEngine {
    rules: CompiledRules,
    scorer: NameScorer,
    max_name_candidates: usize,
}

impl ExtractionEngine {
    /// Compiles the matcher rules and the name scorer.
    pub fn new(config: &ExtractionConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            rules: CompiledRules::compile(&config.unit_vocabulary)?,
            scorer: NameScorer::new(&config.stoplist),
            max_name_candidates: config.name_candidate_lines,
        })
    }

    /// Extracts the three fields from the recognition outputs of one image.
    pub fn extract(&self, outputs: &[OcrOutput]) -> ExtractedFieldSet {
        let default_ref = outputs
            .first()
            .map(|o| OcrRef::new(o.region_index, o.engine.clone()))
            .unwrap_or_else(|| OcrRef::new(0, "none"));

        let lines: Vec<FlatLine> = outputs
            .iter()
            .flat_map(|output| {
                output.lines.iter().map(move |line| FlatLine {
                    region_index: output.region_index,
                    engine: &output.engine,
                    text: &line.text,
                    confidence: line.confidence,
                })
            })
            .filter(|line| !line.text.trim().is_empty())
            .collect();

        // Byte spans consumed by the quantity and ingredient rules, per line;
        // the name rule only sees what is left over.
        let mut spans: Vec<Vec<(usize, usize)>> = vec![Vec::new(); lines.len()];

        // Rule 1: quantity. A count-unit match anywhere beats a dose-unit
        // match, so "20錠" wins even when "500mg" appears on an earlier line.
        let mut count_hit: Option<(usize, RuleMatch)> = None;
        for (idx, line) in lines.iter().enumerate() {
            if let Some(hit) = self.rules.find_quantity_count(line.text) {
                count_hit = Some((idx, hit));
                break;
            }
        }

        // Rule 2: ingredients, in line order, exact repeats removed.
        let mut items: Vec<String> = Vec::new();
        let mut contributing: Vec<f32> = Vec::new();
        let mut ingredients_ref: Option<OcrRef> = None;
        for (idx, line) in lines.iter().enumerate() {
            for hit in self.rules.find_ingredients(line.text) {
                spans[idx].push((hit.start, hit.end));
                contributing.push(line.confidence);
                if ingredients_ref.is_none() {
                    ingredients_ref = Some(OcrRef::new(line.region_index, line.engine));
                }
                if !items.contains(&hit.text) {
                    items.push(hit.text);
                }
            }
        }
        let ingredients = match ingredients_ref {
            Some(source) => ExtractedField::new(
                FieldName::Ingredients,
                FieldValue::List(items),
                mean(&contributing),
                source,
            ),
            None => ExtractedField::empty(FieldName::Ingredients, default_ref.clone()),
        };

        let quantity_hit = count_hit.or_else(|| {
            lines.iter().enumerate().find_map(|(idx, line)| {
                self.rules
                    .find_quantity_dose(line.text)
                    .map(|hit| (idx, hit))
            })
        });
        let quantity = match quantity_hit {
            Some((idx, hit)) => {
                spans[idx].push((hit.start, hit.end));
                let strength = if hit.exact_unit { 1.0 } else { 0.6 };
                let line = &lines[idx];
                ExtractedField::new(
                    FieldName::Quantity,
                    FieldValue::Text(hit.text),
                    line.confidence * strength,
                    OcrRef::new(line.region_index, line.engine),
                )
            }
            None => ExtractedField::empty(FieldName::Quantity, default_ref.clone()),
        };

        // Rule 3: the medicine name is the best-scoring residual line.
        let mut best: Option<(f32, String, OcrRef)> = None;
        let mut rank = 0usize;
        for (idx, line) in lines.iter().enumerate() {
            if rank >= self.max_name_candidates {
                break;
            }
            let residual = mask_spans(line.text, &spans[idx]);
            let Some(candidate) = self.scorer.prepare(&residual) else {
                continue;
            };
            let score = self.scorer.score(&candidate, rank);
            rank += 1;
            let better = best.as_ref().map_or(true, |(b, _, _)| score > *b);
            if better {
                best = Some((
                    score,
                    candidate,
                    OcrRef::new(line.region_index, line.engine),
                ));
            }
        }
        let medicine_name = match best {
            Some((score, text, source)) => ExtractedField::new(
                FieldName::MedicineName,
                FieldValue::Text(text),
                score,
                source,
            ),
            None => ExtractedField::empty(FieldName::MedicineName, default_ref),
        };

        ExtractedFieldSet {
            medicine_name,
            ingredients,
            quantity,
        }
    }
}

fn mask_spans(text: &str, spans: &[(usize, usize)]) -> String {
    if spans.is_empty() {
        return text.to_string();
    }
    text.char_indices()
        .map(|(idx, c)| {
            if spans.iter().any(|&(start, end)| idx >= start && idx < end) {
                ' '
            } else {
                c
            }
        })
        .collect()
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OcrLine;

    fn engine() -> ExtractionEngine {
        ExtractionEngine::new(&ExtractionConfig::default()).unwrap()
    }

    fn output(lines: &[(&str, f32)]) -> OcrOutput {
        OcrOutput::new(
            "tesseract:eng",
            0,
            lines
                .iter()
                .map(|(text, confidence)| OcrLine::new(*text, *confidence))
                .collect(),
        )
    }

    #[test]
    fn dose_and_count_tokens_split_into_ingredients_and_quantity() {
        let fields = engine().extract(&[output(&[(
            "Acetaminophen 500mg Caffeine 65mg 20錠",
            0.9,
        )])]);

        assert_eq!(
            fields.ingredients.value,
            FieldValue::List(vec![
                "Acetaminophen 500mg".to_string(),
                "Caffeine 65mg".to_string(),
            ])
        );
        assert_eq!(fields.quantity.value, FieldValue::Text("20錠".to_string()));
        assert!((fields.quantity.confidence - 0.9).abs() < 1e-6);
        // Every token was consumed by a rule, so no name remains.
        assert_eq!(fields.medicine_name.value, FieldValue::Text(String::new()));
        assert_eq!(fields.medicine_name.confidence, 0.0);
    }

    #[test]
    fn leading_unmatched_text_becomes_the_name() {
        let fields = engine().extract(&[output(&[
            ("Panadol Extra", 0.95),
            ("Acetaminophen 500mg Caffeine 65mg 20錠", 0.9),
        ])]);

        assert_eq!(
            fields.medicine_name.value,
            FieldValue::Text("Panadol Extra".to_string())
        );
        assert!(fields.medicine_name.confidence > 0.5);
        assert_eq!(fields.quantity.value, FieldValue::Text("20錠".to_string()));
    }

    #[test]
    fn empty_input_yields_three_present_fields() {
        let fields = engine().extract(&[OcrOutput::empty("tesseract:eng", 0)]);

        assert_eq!(fields.medicine_name.value, FieldValue::Text(String::new()));
        assert_eq!(fields.ingredients.value, FieldValue::List(Vec::new()));
        assert_eq!(fields.quantity.value, FieldValue::Text(String::new()));
        assert_eq!(fields.medicine_name.confidence, 0.0);
        assert_eq!(fields.ingredients.confidence, 0.0);
        assert_eq!(fields.quantity.confidence, 0.0);
    }

    #[test]
    fn no_outputs_at_all_still_yields_fields() {
        let fields = engine().extract(&[]);
        assert_eq!(fields.medicine_name.confidence, 0.0);
        assert_eq!(fields.ingredients.confidence, 0.0);
        assert_eq!(fields.quantity.confidence, 0.0);
    }

    #[test]
    fn exact_repeats_are_deduplicated() {
        let fields = engine().extract(&[output(&[
            ("Ibuprofen 200mg", 0.9),
            ("Ibuprofen 200mg", 0.8),
        ])]);
        assert_eq!(
            fields.ingredients.value,
            FieldValue::List(vec!["Ibuprofen 200mg".to_string()])
        );
        // Both matches still contribute to the confidence mean.
        assert!((fields.ingredients.confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn count_units_beat_earlier_dose_units_for_quantity() {
        let fields = engine().extract(&[output(&[
            ("Aspirin 100mg", 0.9),
            ("30 tablets", 0.8),
        ])]);
        assert_eq!(
            fields.quantity.value,
            FieldValue::Text("30 tablets".to_string())
        );
        assert!((fields.quantity.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn dose_units_serve_as_quantity_fallback() {
        let fields = engine().extract(&[output(&[("Syrup 120ml", 0.7)])]);
        assert_eq!(fields.quantity.value, FieldValue::Text("120ml".to_string()));
    }

    #[test]
    fn fuzzy_unit_matches_are_discounted() {
        let fields = engine().extract(&[output(&[("20 TABLETS", 1.0)])]);
        assert!((fields.quantity.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn stoplist_lines_cannot_become_the_name() {
        let fields = engine().extract(&[output(&[
            ("Ingredients", 0.9),
            ("Loratadine 10mg", 0.9),
            ("Claritin", 0.85),
        ])]);
        assert_eq!(
            fields.medicine_name.value,
            FieldValue::Text("Claritin".to_string())
        );
    }

    #[test]
    fn label_prefixed_names_are_cleaned() {
        let fields = engine().extract(&[output(&[("品名：普拿疼加強錠", 0.9)])]);
        assert_eq!(
            fields.medicine_name.value,
            FieldValue::Text("普拿疼加強錠".to_string())
        );
    }

    #[test]
    fn extraction_is_deterministic() {
        let outputs = [output(&[
            ("Panadol Extra", 0.95),
            ("Acetaminophen 500mg Caffeine 65mg 20錠", 0.9),
        ])];
        let first = engine().extract(&outputs);
        let second = engine().extract(&outputs);
        assert_eq!(first, second);
    }

    #[test]
    fn fields_reference_their_source_output() {
        let fields = engine().extract(&[
            OcrOutput::new("tesseract:eng", 0, vec![OcrLine::new("Panadol Extra", 0.9)]),
            OcrOutput::new(
                "tesseract:eng",
                1,
                vec![OcrLine::new("Acetaminophen 500mg", 0.9)],
            ),
        ]);
        assert_eq!(fields.medicine_name.source.region_index, 0);
        assert_eq!(fields.ingredients.source.region_index, 1);
    }
}
