//! Configuration surface consumed by the pipeline core.
//!
//! All tunables live here: detection and language-identification thresholds,
//! the extraction unit vocabulary and field weights, and per-stage timeouts.
//! Every struct deserializes with serde and carries deterministic defaults so
//! a pipeline can be built from an empty configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors produced while validating configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value outside its allowed range.
    #[error("invalid value for '{field}': expected {expected}, got {actual}")]
    InvalidField {
        /// The offending field.
        field: String,
        /// Description of the allowed values.
        expected: String,
        /// The value actually provided.
        actual: String,
    },
}

impl ConfigError {
    fn invalid(field: &str, expected: &str, actual: impl std::fmt::Display) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

fn ensure_unit_range(field: &str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) || !value.is_finite() {
        return Err(ConfigError::invalid(field, "a value in [0, 1]", value));
    }
    Ok(())
}

/// Configuration for the image normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Longest allowed image side after normalization. Larger inputs are
    /// scaled down preserving aspect ratio; smaller inputs pass unchanged,
    /// which makes normalization a fixed point.
    #[serde(default = "NormalizerConfig::default_max_side_len")]
    pub max_side_len: u32,
}

impl NormalizerConfig {
    fn default_max_side_len() -> u32 {
        1600
    }

    /// Validates the normalizer configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_side_len == 0 {
            return Err(ConfigError::invalid(
                "normalizer.max_side_len",
                "a positive side length",
                self.max_side_len,
            ));
        }
        Ok(())
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_side_len: Self::default_max_side_len(),
        }
    }
}

/// Configuration for region detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Candidates below this confidence are discarded. When no candidate
    /// clears it, the whole image becomes a single flagged fallback region.
    #[serde(default = "DetectionConfig::default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// Contours covering less than this fraction of the image area are noise.
    #[serde(default = "DetectionConfig::default_min_region_area_ratio")]
    pub min_region_area_ratio: f32,
    /// Upper bound on regions fed to recognition, highest confidence first.
    #[serde(default = "DetectionConfig::default_max_regions")]
    pub max_regions: usize,
}

impl DetectionConfig {
    fn default_confidence_threshold() -> f32 {
        0.1
    }

    fn default_min_region_area_ratio() -> f32 {
        0.01
    }

    fn default_max_regions() -> usize {
        8
    }

    /// Validates the detection configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_unit_range("detection.confidence_threshold", self.confidence_threshold)?;
        ensure_unit_range("detection.min_region_area_ratio", self.min_region_area_ratio)?;
        if self.max_regions == 0 {
            return Err(ConfigError::invalid(
                "detection.max_regions",
                "at least one region",
                self.max_regions,
            ));
        }
        Ok(())
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: Self::default_confidence_threshold(),
            min_region_area_ratio: Self::default_min_region_area_ratio(),
            max_regions: Self::default_max_regions(),
        }
    }
}

/// Configuration for language identification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageIdConfig {
    /// Classifications below this confidence become `unknown`, preserving the
    /// raw score. The pipeline never substitutes a "most likely" language.
    #[serde(default = "LanguageIdConfig::default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// Samples shorter than this (in characters) are too little signal to
    /// classify and yield `unknown` directly.
    #[serde(default = "LanguageIdConfig::default_min_sample_chars")]
    pub min_sample_chars: usize,
}

impl LanguageIdConfig {
    fn default_confidence_threshold() -> f32 {
        0.5
    }

    fn default_min_sample_chars() -> usize {
        5
    }

    /// Validates the language-identification configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_unit_range("language_id.confidence_threshold", self.confidence_threshold)
    }
}

impl Default for LanguageIdConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: Self::default_confidence_threshold(),
            min_sample_chars: Self::default_min_sample_chars(),
        }
    }
}

/// Relative weights of the three extracted fields in the overall record
/// confidence. Weights need not sum to one; they are normalized on use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldWeights {
    /// Weight of the medicine name field.
    #[serde(default = "FieldWeights::default_weight")]
    pub medicine_name: f32,
    /// Weight of the ingredients field.
    #[serde(default = "FieldWeights::default_weight")]
    pub ingredients: f32,
    /// Weight of the quantity field.
    #[serde(default = "FieldWeights::default_weight")]
    pub quantity: f32,
}

impl FieldWeights {
    fn default_weight() -> f32 {
        1.0
    }

    /// Sum of the three weights.
    pub fn total(&self) -> f32 {
        self.medicine_name + self.ingredients + self.quantity
    }

    /// Validates the field weights.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("extraction.field_weights.medicine_name", self.medicine_name),
            ("extraction.field_weights.ingredients", self.ingredients),
            ("extraction.field_weights.quantity", self.quantity),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(field, "a non-negative weight", value));
            }
        }
        if self.total() <= 0.0 {
            return Err(ConfigError::invalid(
                "extraction.field_weights",
                "at least one positive weight",
                self.total(),
            ));
        }
        Ok(())
    }
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            medicine_name: 1.0,
            ingredients: 1.0,
            quantity: 1.0,
        }
    }
}

/// Unit vocabulary driving the extraction matchers.
///
/// Count units describe packaging quantities ("20 tablets", "20錠"); dose
/// units describe ingredient strengths ("500mg", "500毫克"). The defaults seed
/// all five supported label languages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitVocabulary {
    /// Packaging count units.
    #[serde(default = "UnitVocabulary::default_count_units")]
    pub count_units: Vec<String>,
    /// Ingredient dose units.
    #[serde(default = "UnitVocabulary::default_dose_units")]
    pub dose_units: Vec<String>,
}

impl UnitVocabulary {
    fn default_count_units() -> Vec<String> {
        [
            "錠", "锭", "膠囊", "胶囊", "カプセル", "粒", "包", "瓶", "支", "片", "劑", "剤",
            "剂", "本", "枚", "정", "캡슐", "알", "팩", "병", "개", "tablets", "tablet",
            "capsules", "capsule", "caplets", "caplet", "softgels", "softgel", "pills", "pill",
            "packs", "pack", "bottles", "bottle", "pieces", "piece", "doses", "dose",
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    }

    fn default_dose_units() -> Vec<String> {
        [
            "mg", "mcg", "µg", "g", "kg", "ml", "mL", "l", "IU", "毫克", "微克", "公克",
            "公斤", "毫升", "克", "ミリグラム", "マイクログラム", "グラム", "キログラム",
            "ミリリットル", "밀리그램", "마이크로그램", "그램", "킬로그램", "밀리리터",
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    }

    /// Validates the unit vocabulary.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count_units.is_empty() {
            return Err(ConfigError::invalid(
                "extraction.unit_vocabulary.count_units",
                "at least one unit",
                "an empty list",
            ));
        }
        if self.dose_units.is_empty() {
            return Err(ConfigError::invalid(
                "extraction.unit_vocabulary.dose_units",
                "at least one unit",
                "an empty list",
            ));
        }
        Ok(())
    }
}

impl Default for UnitVocabulary {
    fn default() -> Self {
        Self {
            count_units: Self::default_count_units(),
            dose_units: Self::default_dose_units(),
        }
    }
}

/// Configuration for the extraction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Unit vocabulary the matcher rules are compiled from.
    #[serde(default)]
    pub unit_vocabulary: UnitVocabulary,
    /// Field weights for the derived record confidence.
    #[serde(default)]
    pub field_weights: FieldWeights,
    /// Label-section keywords that disqualify a line from being the product
    /// name ("ingredients", "成分", lot/expiry markers and the like).
    #[serde(default = "ExtractionConfig::default_stoplist")]
    pub stoplist: Vec<String>,
    /// How many residual lines are considered as name candidates. Names sit
    /// near the top of a label; lines past this cutoff are ignored.
    #[serde(default = "ExtractionConfig::default_name_candidate_lines")]
    pub name_candidate_lines: usize,
}

impl ExtractionConfig {
    fn default_stoplist() -> Vec<String> {
        [
            "品名", "藥品", "药品", "商品名", "學名", "学名", "薬品名", "상품명", "약명",
            "成分", "主成分", "活性成分", "配方", "含有", "含量", "組成", "组成", "賦形劑",
            "赋形剂", "用量", "用法", "數量", "数量", "劑量", "剂量", "注意", "警告",
            "有効期限", "使用期限", "効能", "效能", "성분", "함량", "수량", "용량", "주의",
            "ingredients", "ingredient", "active", "composition", "contains", "content",
            "component", "excipient", "formulation", "dosage", "dose", "quantity", "amount",
            "warning", "warnings", "caution", "directions", "exp", "lot", "batch",
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    }

    fn default_name_candidate_lines() -> usize {
        6
    }

    /// Validates the extraction configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.unit_vocabulary.validate()?;
        self.field_weights.validate()?;
        if self.name_candidate_lines == 0 {
            return Err(ConfigError::invalid(
                "extraction.name_candidate_lines",
                "at least one candidate line",
                self.name_candidate_lines,
            ));
        }
        Ok(())
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            unit_vocabulary: UnitVocabulary::default(),
            field_weights: FieldWeights::default(),
            stoplist: Self::default_stoplist(),
            name_candidate_lines: Self::default_name_candidate_lines(),
        }
    }
}

/// Per-stage timeouts for blocking engine invocations, in milliseconds.
///
/// A timeout is treated identically to an engine failure: recognition retries
/// with the default engine, detection is fatal for the run, language
/// identification degrades to `unknown`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StageTimeouts {
    /// Region detection timeout.
    #[serde(default = "StageTimeouts::default_detection_ms")]
    pub detection_ms: u64,
    /// Provisional (sampling) recognition timeout.
    #[serde(default = "StageTimeouts::default_provisional_ocr_ms")]
    pub provisional_ocr_ms: u64,
    /// Language identification timeout.
    #[serde(default = "StageTimeouts::default_language_id_ms")]
    pub language_id_ms: u64,
    /// Final recognition timeout, per region and per attempt.
    #[serde(default = "StageTimeouts::default_final_ocr_ms")]
    pub final_ocr_ms: u64,
}

impl StageTimeouts {
    fn default_detection_ms() -> u64 {
        10_000
    }

    fn default_provisional_ocr_ms() -> u64 {
        8_000
    }

    fn default_language_id_ms() -> u64 {
        2_000
    }

    fn default_final_ocr_ms() -> u64 {
        20_000
    }

    /// Region detection timeout as a [`Duration`].
    pub fn detection(&self) -> Duration {
        Duration::from_millis(self.detection_ms)
    }

    /// Provisional recognition timeout as a [`Duration`].
    pub fn provisional_ocr(&self) -> Duration {
        Duration::from_millis(self.provisional_ocr_ms)
    }

    /// Language identification timeout as a [`Duration`].
    pub fn language_id(&self) -> Duration {
        Duration::from_millis(self.language_id_ms)
    }

    /// Final recognition timeout as a [`Duration`].
    pub fn final_ocr(&self) -> Duration {
        Duration::from_millis(self.final_ocr_ms)
    }

    /// Validates the stage timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("timeouts.detection_ms", self.detection_ms),
            ("timeouts.provisional_ocr_ms", self.provisional_ocr_ms),
            ("timeouts.language_id_ms", self.language_id_ms),
            ("timeouts.final_ocr_ms", self.final_ocr_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(field, "a positive timeout", value));
            }
        }
        Ok(())
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            detection_ms: Self::default_detection_ms(),
            provisional_ocr_ms: Self::default_provisional_ocr_ms(),
            language_id_ms: Self::default_language_id_ms(),
            final_ocr_ms: Self::default_final_ocr_ms(),
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Image normalizer settings.
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    /// Region detection settings.
    #[serde(default)]
    pub detection: DetectionConfig,
    /// Language identification settings.
    #[serde(default)]
    pub language_id: LanguageIdConfig,
    /// Extraction settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Per-stage timeouts.
    #[serde(default)]
    pub timeouts: StageTimeouts,
}

impl PipelineConfig {
    /// Validates every section of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.normalizer.validate()?;
        self.detection.validate()?;
        self.language_id.validate()?;
        self.extraction.validate()?;
        self.timeouts.validate()?;
        Ok(())
    }
}
