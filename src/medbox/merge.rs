//! Front/back record reconciliation.

use crate::domain::{ExtractedField, MedicineRecord, RecordSource};

/// Merges the records of a front/back pair into one.
///
/// Field by field, the higher-confidence candidate wins; on a tie the front
/// wins. The detected language follows the winning name field. The merged
/// record keeps the shared image id and is tagged `merged`.
pub fn merge_records(front: &MedicineRecord, back: &MedicineRecord) -> MedicineRecord {
    let medicine_name = pick(&front.medicine_name, &back.medicine_name);
    let ingredients = pick(&front.ingredients, &back.ingredients);
    let quantity = pick(&front.quantity, &back.quantity);

    let detected_language = if back.medicine_name.confidence > front.medicine_name.confidence {
        back.detected_language
    } else {
        front.detected_language
    };

    MedicineRecord {
        image_id: front.image_id.clone(),
        detected_language,
        medicine_name,
        ingredients,
        quantity,
        source: RecordSource::Merged,
    }
}

fn pick(front: &ExtractedField, back: &ExtractedField) -> ExtractedField {
    if back.confidence > front.confidence {
        back.clone()
    } else {
        front.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldName, FieldValue, Language, OcrRef};

    fn record(
        source: RecordSource,
        language: Language,
        name: (&str, f32),
        ingredients: (&[&str], f32),
        quantity: (&str, f32),
    ) -> MedicineRecord {
        let ocr_ref = OcrRef::new(0, "stub");
        MedicineRecord {
            image_id: "img-1".to_string(),
            detected_language: language,
            medicine_name: ExtractedField::new(
                FieldName::MedicineName,
                FieldValue::Text(name.0.to_string()),
                name.1,
                ocr_ref.clone(),
            ),
            ingredients: ExtractedField::new(
                FieldName::Ingredients,
                FieldValue::List(ingredients.0.iter().map(|s| s.to_string()).collect()),
                ingredients.1,
                ocr_ref.clone(),
            ),
            quantity: ExtractedField::new(
                FieldName::Quantity,
                FieldValue::Text(quantity.0.to_string()),
                quantity.1,
                ocr_ref,
            ),
            source,
        }
    }

    #[test]
    fn higher_confidence_wins_per_field() {
        let front = record(
            RecordSource::Front,
            Language::En,
            ("Panadol", 0.8),
            (&["Acetaminophen 500mg"], 0.4),
            ("", 0.0),
        );
        let back = record(
            RecordSource::Back,
            Language::ZhTw,
            ("Pnadol", 0.3),
            (&["Acetaminophen 500mg", "Caffeine 65mg"], 0.9),
            ("20錠", 0.7),
        );

        let merged = merge_records(&front, &back);
        assert_eq!(merged.source, RecordSource::Merged);
        assert_eq!(
            merged.medicine_name.value,
            FieldValue::Text("Panadol".to_string())
        );
        assert_eq!(
            merged.ingredients.value,
            FieldValue::List(vec![
                "Acetaminophen 500mg".to_string(),
                "Caffeine 65mg".to_string(),
            ])
        );
        assert_eq!(merged.quantity.value, FieldValue::Text("20錠".to_string()));
        // Language follows the winning name field.
        assert_eq!(merged.detected_language, Language::En);
    }

    #[test]
    fn ties_prefer_the_front() {
        let front = record(
            RecordSource::Front,
            Language::En,
            ("Front Name", 0.5),
            (&[], 0.0),
            ("10 tablets", 0.5),
        );
        let back = record(
            RecordSource::Back,
            Language::Ja,
            ("Back Name", 0.5),
            (&[], 0.0),
            ("20 tablets", 0.5),
        );

        let merged = merge_records(&front, &back);
        assert_eq!(
            merged.medicine_name.value,
            FieldValue::Text("Front Name".to_string())
        );
        assert_eq!(
            merged.quantity.value,
            FieldValue::Text("10 tablets".to_string())
        );
        assert_eq!(merged.detected_language, Language::En);
    }

    #[test]
    fn merge_is_deterministic() {
        let front = record(
            RecordSource::Front,
            Language::En,
            ("A", 0.6),
            (&["x 1mg"], 0.2),
            ("1 pack", 0.9),
        );
        let back = record(
            RecordSource::Back,
            Language::Ko,
            ("B", 0.7),
            (&["y 2mg"], 0.1),
            ("2 packs", 0.8),
        );
        assert_eq!(merge_records(&front, &back), merge_records(&front, &back));
    }
}
