//! Extracted fields and the final medicine record.

use crate::core::config::FieldWeights;
use crate::domain::asset::ImageRole;
use crate::domain::language::Language;
use serde::{Deserialize, Serialize};

/// The three fields extracted from a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldName {
    /// The product name.
    #[serde(rename = "medicineName")]
    MedicineName,
    /// Active ingredients with their strengths.
    #[serde(rename = "ingredients")]
    Ingredients,
    /// Packaging quantity.
    #[serde(rename = "quantity")]
    Quantity,
}

/// The value carried by an extracted field: text for name and quantity, an
/// ordered list for ingredients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// Ordered list of entries, insertion order = line order.
    List(Vec<String>),
}

impl FieldValue {
    /// True when the value carries no content.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }
}

/// Reference to the recognition output a field was extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrRef {
    /// Index of the source region within the run's region list.
    pub region_index: usize,
    /// Identifier of the engine that recognized the text.
    pub engine: String,
}

impl OcrRef {
    /// Creates a reference.
    pub fn new(region_index: usize, engine: impl Into<String>) -> Self {
        Self {
            region_index,
            engine: engine.into(),
        }
    }
}

/// One extracted field with its confidence and provenance.
///
/// A field with no candidate is present with an empty value and confidence
/// zero, never omitted; consumers can rely on all three fields existing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    /// Which field this is.
    pub name: FieldName,
    /// The extracted value.
    pub value: FieldValue,
    /// Extraction confidence in [0, 1].
    pub confidence: f32,
    /// The recognition output this field came from.
    pub source: OcrRef,
}

impl ExtractedField {
    /// Creates a field.
    pub fn new(name: FieldName, value: FieldValue, confidence: f32, source: OcrRef) -> Self {
        Self {
            name,
            value,
            confidence,
            source,
        }
    }

    /// A present-but-empty field with confidence zero.
    pub fn empty(name: FieldName, source: OcrRef) -> Self {
        let value = match name {
            FieldName::Ingredients => FieldValue::List(Vec::new()),
            _ => FieldValue::Text(String::new()),
        };
        Self::new(name, value, 0.0, source)
    }

    /// The value as text; list values are joined with "; ".
    pub fn value_text(&self) -> String {
        match &self.value {
            FieldValue::Text(text) => text.clone(),
            FieldValue::List(items) => items.join("; "),
        }
    }
}

/// Where a record's fields came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    /// Front image only.
    Front,
    /// Back image only.
    Back,
    /// Reconciled from both images.
    Merged,
}

impl From<ImageRole> for RecordSource {
    fn from(role: ImageRole) -> Self {
        match role {
            ImageRole::Front => RecordSource::Front,
            ImageRole::Back => RecordSource::Back,
        }
    }
}

impl std::fmt::Display for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordSource::Front => write!(f, "front"),
            RecordSource::Back => write!(f, "back"),
            RecordSource::Merged => write!(f, "merged"),
        }
    }
}

/// The structured output of one pipeline run, for one image or merged from a
/// front/back pair. Immutable once created; ownership transfers to the
/// persistence collaborator on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineRecord {
    /// Identifier of the submission this record belongs to.
    pub image_id: String,
    /// Language the final recognition pass ran with.
    pub detected_language: Language,
    /// The product name field.
    pub medicine_name: ExtractedField,
    /// The ingredients field.
    pub ingredients: ExtractedField,
    /// The quantity field.
    pub quantity: ExtractedField,
    /// Provenance of the fields.
    pub source: RecordSource,
}

impl MedicineRecord {
    /// Overall confidence: the weighted average of the three field
    /// confidences, rounded to two decimals. Derived on demand, never stored.
    pub fn overall_confidence(&self, weights: &FieldWeights) -> f32 {
        let total = weights.total();
        if total <= 0.0 {
            return 0.0;
        }
        let weighted = self.medicine_name.confidence * weights.medicine_name
            + self.ingredients.confidence * weights.ingredients
            + self.quantity.confidence * weights.quantity;
        round2(weighted / total)
    }

    /// The stable JSON shape handed to collaborators.
    pub fn to_response(&self, weights: &FieldWeights) -> RecordResponse {
        let ingredients = match &self.ingredients.value {
            FieldValue::List(items) => items.clone(),
            FieldValue::Text(text) if !text.is_empty() => vec![text.clone()],
            FieldValue::Text(_) => Vec::new(),
        };
        RecordResponse {
            image_id: self.image_id.clone(),
            detected_language: self.detected_language,
            medicine_name: match &self.medicine_name.value {
                FieldValue::Text(text) => text.clone(),
                FieldValue::List(items) => items.join(" "),
            },
            ingredients,
            quantity: match &self.quantity.value {
                FieldValue::Text(text) => text.clone(),
                FieldValue::List(items) => items.join(" "),
            },
            source: self.source,
            confidence: self.overall_confidence(weights),
        }
    }
}

/// Wire representation of a completed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    /// Identifier of the submission.
    pub image_id: String,
    /// Detected language code.
    pub detected_language: Language,
    /// Extracted product name, possibly empty.
    pub medicine_name: String,
    /// Extracted ingredient entries, possibly empty.
    pub ingredients: Vec<String>,
    /// Extracted packaging quantity, possibly empty.
    pub quantity: String,
    /// Provenance of the fields.
    pub source: RecordSource,
    /// Overall confidence in [0, 1], two decimals.
    pub confidence: f32,
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_confidences(name: f32, ingredients: f32, quantity: f32) -> MedicineRecord {
        let source = OcrRef::new(0, "tesseract:eng");
        MedicineRecord {
            image_id: "img-1".to_string(),
            detected_language: Language::En,
            medicine_name: ExtractedField::new(
                FieldName::MedicineName,
                FieldValue::Text("Panadol".to_string()),
                name,
                source.clone(),
            ),
            ingredients: ExtractedField::new(
                FieldName::Ingredients,
                FieldValue::List(vec!["Acetaminophen 500mg".to_string()]),
                ingredients,
                source.clone(),
            ),
            quantity: ExtractedField::new(
                FieldName::Quantity,
                FieldValue::Text("20錠".to_string()),
                quantity,
                source,
            ),
            source: RecordSource::Front,
        }
    }

    #[test]
    fn overall_confidence_is_the_rounded_equal_weight_mean() {
        let record = record_with_confidences(0.9, 0.6, 0.3);
        let confidence = record.overall_confidence(&FieldWeights::default());
        assert_eq!(confidence, 0.6);
    }

    #[test]
    fn overall_confidence_honors_weights() {
        let record = record_with_confidences(1.0, 0.0, 0.0);
        let weights = FieldWeights {
            medicine_name: 3.0,
            ingredients: 1.0,
            quantity: 1.0,
        };
        assert_eq!(record.overall_confidence(&weights), 0.6);
    }

    #[test]
    fn empty_fields_are_present_with_zero_confidence() {
        let field = ExtractedField::empty(FieldName::Ingredients, OcrRef::new(0, "none"));
        assert!(field.value.is_empty());
        assert_eq!(field.confidence, 0.0);
        assert!(matches!(field.value, FieldValue::List(_)));
    }

    #[test]
    fn response_uses_the_stable_field_names() {
        let record = record_with_confidences(0.9, 0.6, 0.3);
        let json =
            serde_json::to_value(record.to_response(&FieldWeights::default())).unwrap();
        assert_eq!(json["imageId"], "img-1");
        assert_eq!(json["detectedLanguage"], "en");
        assert_eq!(json["medicineName"], "Panadol");
        assert_eq!(json["ingredients"][0], "Acetaminophen 500mg");
        assert_eq!(json["quantity"], "20錠");
        assert_eq!(json["source"], "front");
        assert!((json["confidence"].as_f64().unwrap() - 0.6).abs() < 1e-6);
    }
}
