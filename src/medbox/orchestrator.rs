//! End-to-end pipeline orchestration.
//!
//! One submission carries a front image and optionally a back image. Each
//! image runs the stage sequence Received → Normalized → Detected →
//! LanguageIdentified → Recognized → Extracted → Complete, with a terminal
//! Failed(stage, reason) reachable from any non-terminal state. Front and
//! back run concurrently and are reconciled at the end; a failure in one
//! image never aborts the other.
//!
//! Every model invocation runs on the blocking pool under its configured
//! timeout. Cancellation is dropping the returned future: in-flight engine
//! calls finish on the blocking pool but their results are discarded, and
//! nothing is persisted.

use crate::core::config::PipelineConfig;
use crate::core::errors::{PipelineError, PipelineStage, StageFailure};
use crate::core::registry::EngineRegistry;
use crate::core::traits::TextRecognizer;
use crate::domain::{
    ImageAsset, ImageRole, LanguageGuess, MedicineRecord, OcrOutput, RecordResponse, Region,
};
use crate::extraction::ExtractionEngine;
use crate::langid::LanguageIdentifier;
use crate::medbox::merge::merge_records;
use crate::processors::{ImageNormalizer, NormalizedImage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Cap on the provisional text sample handed to language identification.
const SAMPLE_MAX_CHARS: usize = 400;

/// One upload: a front image and an optional back image.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Identifier shared by both images and the resulting record.
    pub id: Uuid,
    /// The front image.
    pub front: ImageAsset,
    /// The back image, when provided.
    pub back: Option<ImageAsset>,
}

impl Submission {
    /// Creates a submission with a fresh id from front-image bytes.
    pub fn new(front_bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            front: ImageAsset::front(front_bytes),
            back: None,
        }
    }

    /// Attaches the back image.
    pub fn with_back(mut self, back_bytes: Vec<u8>) -> Self {
        self.back = Some(ImageAsset::back(back_bytes));
        self
    }

    /// Replaces the generated id.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// Lifecycle of one image's pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    /// The asset has been handed to the orchestrator.
    Received,
    /// The image decoded into its canonical form.
    Normalized,
    /// Regions located (or the fallback region substituted).
    Detected,
    /// A language guess is available.
    LanguageIdentified,
    /// Final recognition finished for at least one region.
    Recognized,
    /// Fields extracted.
    Extracted,
    /// The record exists.
    Complete,
    /// The run terminated early.
    Failed {
        /// The stage the run failed in.
        stage: PipelineStage,
        /// Human-readable failure reason.
        reason: String,
    },
}

impl RunState {
    fn order(&self) -> u8 {
        match self {
            RunState::Received => 0,
            RunState::Normalized => 1,
            RunState::Detected => 2,
            RunState::LanguageIdentified => 3,
            RunState::Recognized => 4,
            RunState::Extracted => 5,
            RunState::Complete => 6,
            RunState::Failed { .. } => 7,
        }
    }

    /// True for `Complete` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Complete | RunState::Failed { .. })
    }

    /// Whether `next` is a legal successor of this state: the stage sequence
    /// advances one step at a time, and `Failed` is reachable from any
    /// non-terminal state.
    pub fn can_advance_to(&self, next: &RunState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            RunState::Failed { .. } => true,
            _ => next.order() == self.order() + 1,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Received => write!(f, "received"),
            RunState::Normalized => write!(f, "normalized"),
            RunState::Detected => write!(f, "detected"),
            RunState::LanguageIdentified => write!(f, "language-identified"),
            RunState::Recognized => write!(f, "recognized"),
            RunState::Extracted => write!(f, "extracted"),
            RunState::Complete => write!(f, "complete"),
            RunState::Failed { stage, .. } => write!(f, "failed({stage})"),
        }
    }
}

struct RunTrace {
    image_id: String,
    role: ImageRole,
    state: RunState,
}

impl RunTrace {
    fn new(image_id: &str, role: ImageRole) -> Self {
        debug!(image_id, %role, "pipeline run received");
        Self {
            image_id: image_id.to_string(),
            role,
            state: RunState::Received,
        }
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(self.state.can_advance_to(&next));
        debug!(image_id = %self.image_id, role = %self.role, from = %self.state, to = %next, "pipeline state");
        self.state = next;
    }

    fn fail(&mut self, stage: PipelineStage, err: PipelineError) -> StageFailure {
        let failure = StageFailure::new(stage, err);
        warn!(
            image_id = %self.image_id,
            role = %self.role,
            %stage,
            error = %failure.error,
            "pipeline run failed"
        );
        self.state = RunState::Failed {
            stage,
            reason: failure.error.to_string(),
        };
        failure
    }
}

/// Per-image result with provenance the record itself does not carry.
#[derive(Debug, Clone)]
pub struct ImageRunOutcome {
    /// The record built from this image.
    pub record: MedicineRecord,
    /// Concatenated final recognition text, for callers that want it.
    pub raw_text: String,
    /// True when detection fell back to the whole-image region; results
    /// should be discounted accordingly.
    pub fallback_region_used: bool,
    /// Regions dropped after the recognition retry was exhausted.
    pub failed_regions: usize,
}

/// The result of one submission.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    /// The record handed to collaborators: merged when both images survived,
    /// otherwise the surviving image's record.
    pub record: MedicineRecord,
    /// The front image's outcome, if its run completed.
    pub front: Option<ImageRunOutcome>,
    /// The back image's outcome, if its run completed.
    pub back: Option<ImageRunOutcome>,
}

/// Sequences the pipeline stages per image and reconciles front/back pairs.
#[derive(Debug)]
pub struct Orchestrator {
    registry: Arc<EngineRegistry>,
    config: PipelineConfig,
    normalizer: ImageNormalizer,
    identifier: LanguageIdentifier,
    extraction: ExtractionEngine,
}

impl Orchestrator {
    /// Creates an orchestrator over a built engine registry.
    pub fn new(registry: EngineRegistry, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let registry = Arc::new(registry);
        let normalizer = ImageNormalizer::new(&config.normalizer);
        let identifier = LanguageIdentifier::new(registry.classifier().clone(), &config.language_id);
        let extraction = ExtractionEngine::new(&config.extraction)?;
        Ok(Self {
            registry,
            config,
            normalizer,
            identifier,
            extraction,
        })
    }

    /// The configuration this orchestrator runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The wire representation of a record, with the derived confidence.
    pub fn response(&self, record: &MedicineRecord) -> RecordResponse {
        record.to_response(&self.config.extraction.field_weights)
    }

    /// Processes one submission.
    ///
    /// Front and back images run concurrently and are merged per field at
    /// the end. If one image's run fails the other's record is returned as
    /// is; the submission fails only when every image failed, and then the
    /// failing stage is named.
    pub async fn process(&self, submission: Submission) -> Result<SubmissionOutcome, StageFailure> {
        let image_id = submission.id.to_string();

        let Some(back) = submission.back else {
            let outcome = self.run_image(&image_id, submission.front).await?;
            return Ok(SubmissionOutcome {
                record: outcome.record.clone(),
                front: Some(outcome),
                back: None,
            });
        };

        let (front_result, back_result) = tokio::join!(
            self.run_image(&image_id, submission.front),
            self.run_image(&image_id, back)
        );

        match (front_result, back_result) {
            (Ok(front), Ok(back)) => {
                let record = merge_records(&front.record, &back.record);
                info!(%image_id, confidence = self.response(&record).confidence, "front/back records merged");
                Ok(SubmissionOutcome {
                    record,
                    front: Some(front),
                    back: Some(back),
                })
            }
            (Ok(front), Err(back_failure)) => {
                warn!(%image_id, error = %back_failure, "back image failed; returning front record");
                Ok(SubmissionOutcome {
                    record: front.record.clone(),
                    front: Some(front),
                    back: None,
                })
            }
            (Err(front_failure), Ok(back)) => {
                warn!(%image_id, error = %front_failure, "front image failed; returning back record");
                Ok(SubmissionOutcome {
                    record: back.record.clone(),
                    front: None,
                    back: Some(back),
                })
            }
            (Err(front_failure), Err(back_failure)) => {
                error!(
                    %image_id,
                    front_error = %front_failure,
                    back_error = %back_failure,
                    "both images failed"
                );
                Err(front_failure)
            }
        }
    }

    /// Runs the full stage sequence for one image.
    async fn run_image(
        &self,
        image_id: &str,
        asset: ImageAsset,
    ) -> Result<ImageRunOutcome, StageFailure> {
        let role = asset.role;
        let mut trace = RunTrace::new(image_id, role);

        let normalized = match self.normalizer.normalize_bytes(&asset.bytes) {
            Ok(normalized) => normalized,
            Err(err) => return Err(trace.fail(PipelineStage::Normalization, err)),
        };
        trace.advance(RunState::Normalized);

        let regions = match self.detect_regions(&normalized).await {
            Ok(regions) => regions,
            Err(err) => return Err(trace.fail(PipelineStage::Detection, err)),
        };
        let fallback_region_used = regions[0].fallback;
        trace.advance(RunState::Detected);

        let sample = self.provisional_sample(&normalized, &regions[0]).await;
        let guess = self.identify_language(&sample).await;
        debug!(image_id, %role, language = %guess.language, confidence = guess.confidence, "language identified");
        trace.advance(RunState::LanguageIdentified);

        let (outputs, failed_regions) = self.recognize_regions(&normalized, &regions, &guess).await;
        if outputs.is_empty() {
            let first_failure = failed_regions
                .into_iter()
                .map(|(_, err)| err)
                .next()
                .unwrap_or_else(|| PipelineError::Internal {
                    message: "no region produced output".to_string(),
                });
            return Err(trace.fail(PipelineStage::Recognition, first_failure));
        }
        let failed_region_count = failed_regions.len();
        trace.advance(RunState::Recognized);

        let raw_text = outputs
            .iter()
            .map(OcrOutput::concatenated_text)
            .collect::<Vec<_>>()
            .join("\n");
        let fields = self.extraction.extract(&outputs);
        trace.advance(RunState::Extracted);

        let record = MedicineRecord {
            image_id: image_id.to_string(),
            detected_language: guess.language,
            medicine_name: fields.medicine_name,
            ingredients: fields.ingredients,
            quantity: fields.quantity,
            source: role.into(),
        };
        trace.advance(RunState::Complete);
        info!(
            image_id,
            %role,
            language = %record.detected_language,
            confidence = self.response(&record).confidence,
            fallback_region_used,
            failed_regions = failed_region_count,
            "pipeline run complete"
        );

        Ok(ImageRunOutcome {
            record,
            raw_text,
            fallback_region_used,
            failed_regions: failed_region_count,
        })
    }

    /// Detection plus the threshold/fallback policy: the result is ordered by
    /// confidence, capped, and never empty.
    async fn detect_regions(
        &self,
        image: &NormalizedImage,
    ) -> Result<Vec<Region>, PipelineError> {
        let detector = self.registry.detector().clone();
        let input = image.clone();
        let detected = run_blocking(
            self.config.timeouts.detection(),
            PipelineStage::Detection,
            move || detector.detect(&input),
        )
        .await
        .map_err(|err| match err {
            // Detector timeout means the model infrastructure is unusable.
            PipelineError::Timeout { .. } => PipelineError::DetectionUnavailable {
                message: err.to_string(),
            },
            other => other,
        })?;

        let threshold = self.config.detection.confidence_threshold;
        let mut kept: Vec<Region> = detected
            .into_iter()
            .filter(|region| region.confidence >= threshold)
            .collect();
        kept.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| (a.bbox.y, a.bbox.x).cmp(&(b.bbox.y, b.bbox.x)))
        });
        kept.truncate(self.config.detection.max_regions);

        if kept.is_empty() {
            warn!(
                detector = self.registry.detector().name(),
                "no region cleared the detection threshold; using the whole image"
            );
            kept.push(Region::whole_image(image.width(), image.height()));
        }
        Ok(kept)
    }

    /// The provisional text sample. Empty text is a valid low-information
    /// signal, so sampler failures and timeouts degrade to an empty sample.
    async fn provisional_sample(&self, image: &NormalizedImage, region: &Region) -> String {
        let engine = self.registry.provisional().clone();
        let crop = region.crop(&image.color);
        let result = run_blocking(
            self.config.timeouts.provisional_ocr(),
            PipelineStage::ProvisionalRecognition,
            move || engine.recognize(&crop),
        )
        .await;

        match result {
            Ok(lines) => OcrOutput::new(self.registry.provisional().id(), 0, lines)
                .sample_text(SAMPLE_MAX_CHARS),
            Err(err) => {
                warn!(error = %err, "provisional recognition produced no sample");
                String::new()
            }
        }
    }

    /// Language identification under its timeout. A timeout or worker
    /// failure degrades to `unknown`, the documented fallback path.
    async fn identify_language(&self, sample: &str) -> LanguageGuess {
        let identifier = self.identifier.clone();
        let text = sample.to_string();
        let result = run_blocking(
            self.config.timeouts.language_id(),
            PipelineStage::LanguageIdentification,
            move || Ok(identifier.identify(&text)),
        )
        .await;

        match result {
            Ok(guess) => guess,
            Err(err) => {
                warn!(error = %err, "language identification unavailable; treating as unknown");
                LanguageGuess::unknown(0.0)
            }
        }
    }

    /// Final recognition over every region with per-region failure isolation.
    async fn recognize_regions(
        &self,
        image: &NormalizedImage,
        regions: &[Region],
        guess: &LanguageGuess,
    ) -> (Vec<OcrOutput>, Vec<(usize, PipelineError)>) {
        let engine = self.registry.select_final_engine(guess).clone();
        let default_engine = self.registry.default_engine().clone();

        let mut outputs = Vec::with_capacity(regions.len());
        let mut failures = Vec::new();
        for (region_index, region) in regions.iter().enumerate() {
            let crop = region.crop(&image.color);
            match self
                .recognize_one(region_index, crop, &engine, &default_engine)
                .await
            {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    warn!(region_index, error = %err, "region dropped after retry");
                    failures.push((region_index, err));
                }
            }
        }
        (outputs, failures)
    }

    /// One region's recognition: the selected engine first, then one retry
    /// with the default engine before the region is given up.
    async fn recognize_one(
        &self,
        region_index: usize,
        crop: image::RgbImage,
        engine: &Arc<dyn TextRecognizer>,
        default_engine: &Arc<dyn TextRecognizer>,
    ) -> Result<OcrOutput, PipelineError> {
        let timeout = self.config.timeouts.final_ocr();

        let attempt = {
            let engine = engine.clone();
            let crop = crop.clone();
            run_blocking(timeout, PipelineStage::Recognition, move || {
                engine.recognize(&crop)
            })
            .await
        };
        let first_error = match attempt {
            Ok(lines) => return Ok(OcrOutput::new(engine.id(), region_index, lines)),
            Err(err) => err,
        };

        debug!(
            region_index,
            engine = engine.id(),
            error = %first_error,
            "recognition failed; retrying with the default engine"
        );
        let retry = {
            let default_engine = default_engine.clone();
            run_blocking(timeout, PipelineStage::Recognition, move || {
                default_engine.recognize(&crop)
            })
            .await
        };
        match retry {
            Ok(lines) => Ok(OcrOutput::new(default_engine.id(), region_index, lines)),
            Err(retry_error) => Err(PipelineError::ocr_failed(
                default_engine.id(),
                format!("{first_error}; retry: {retry_error}"),
            )),
        }
    }
}

/// Runs a blocking engine invocation under a timeout.
async fn run_blocking<T, F>(
    timeout: Duration,
    stage: PipelineStage,
    f: F,
) -> Result<T, PipelineError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(f);
    match tokio::time::timeout(timeout, handle).await {
        Err(_elapsed) => Err(PipelineError::Timeout {
            stage,
            timeout_ms: timeout.as_millis() as u64,
        }),
        Ok(Err(join_error)) => Err(PipelineError::Internal {
            message: format!("{stage} worker failed: {join_error}"),
        }),
        Ok(Ok(result)) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::{LanguageClassifier, RegionDetector};
    use crate::domain::{BoundingBox, Language, OcrLine, RecordSource};
    use image::RgbImage;

    #[derive(Debug)]
    struct StubDetector {
        regions: Vec<Region>,
    }

    impl RegionDetector for StubDetector {
        fn name(&self) -> &str {
            "stub-detector"
        }

        fn detect(&self, _image: &NormalizedImage) -> Result<Vec<Region>, PipelineError> {
            Ok(self.regions.clone())
        }
    }

    #[derive(Debug)]
    struct StubClassifier {
        guess: LanguageGuess,
    }

    impl LanguageClassifier for StubClassifier {
        fn name(&self) -> &str {
            "stub-classifier"
        }

        fn classify(&self, _text: &str) -> LanguageGuess {
            self.guess
        }
    }

    /// Recognizer that returns fixed lines, but errors for crops at least
    /// `fail_min_width` wide and sleeps when asked (to exercise timeouts).
    #[derive(Debug)]
    struct StubRecognizer {
        id: String,
        lines: Vec<OcrLine>,
        fail_min_width: Option<u32>,
        sleep: Option<Duration>,
    }

    impl StubRecognizer {
        fn lines(id: &str, lines: &[(&str, f32)]) -> Self {
            Self {
                id: id.to_string(),
                lines: lines
                    .iter()
                    .map(|(text, confidence)| OcrLine::new(*text, *confidence))
                    .collect(),
                fail_min_width: None,
                sleep: None,
            }
        }

        fn failing_above(id: &str, lines: &[(&str, f32)], width: u32) -> Self {
            let mut stub = Self::lines(id, lines);
            stub.fail_min_width = Some(width);
            stub
        }

        fn sleeping(id: &str, sleep: Duration) -> Self {
            let mut stub = Self::lines(id, &[("slow", 0.5)]);
            stub.sleep = Some(sleep);
            stub
        }
    }

    impl TextRecognizer for StubRecognizer {
        fn id(&self) -> &str {
            &self.id
        }

        fn recognize(&self, image: &RgbImage) -> Result<Vec<OcrLine>, PipelineError> {
            if let Some(sleep) = self.sleep {
                std::thread::sleep(sleep);
            }
            if let Some(width) = self.fail_min_width {
                if image.width() >= width {
                    return Err(PipelineError::ocr_failed(&self.id, "stub engine failure"));
                }
            }
            Ok(self.lines.clone())
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, image::Rgb([200, 180, 160]));
        crate::utils::encode_png(&image).unwrap()
    }

    fn full_region() -> Region {
        Region::new(BoundingBox::new(0, 0, 10_000, 10_000), 0.9)
    }

    fn label_lines() -> Vec<(&'static str, f32)> {
        vec![
            ("Panadol Extra", 0.95),
            ("Acetaminophen 500mg Caffeine 65mg 20錠", 0.9),
        ]
    }

    struct Setup {
        detector_regions: Vec<Region>,
        guess: LanguageGuess,
        final_engine: StubRecognizer,
        default_engine: StubRecognizer,
        config: PipelineConfig,
    }

    impl Default for Setup {
        fn default() -> Self {
            Self {
                detector_regions: vec![full_region()],
                guess: LanguageGuess::new(Language::En, 0.9),
                final_engine: StubRecognizer::lines("stub:eng", &label_lines()),
                default_engine: StubRecognizer::lines("stub:default", &label_lines()),
                config: PipelineConfig::default(),
            }
        }
    }

    impl Setup {
        fn orchestrator(self) -> Orchestrator {
            let mut registry = EngineRegistry::new(
                Arc::new(StubDetector {
                    regions: self.detector_regions,
                }),
                Arc::new(StubClassifier { guess: self.guess }),
                Arc::new(StubRecognizer::lines("stub:provisional", &label_lines())),
                Arc::new(self.default_engine),
            );
            registry
                .register_final_engine(Language::En, Arc::new(self.final_engine))
                .unwrap();
            Orchestrator::new(registry, self.config).unwrap()
        }
    }

    #[tokio::test]
    async fn a_single_image_produces_a_complete_record() {
        let orchestrator = Setup::default().orchestrator();
        let outcome = orchestrator
            .process(Submission::new(png_bytes(64, 48)))
            .await
            .unwrap();

        let record = &outcome.record;
        assert_eq!(record.source, RecordSource::Front);
        assert_eq!(record.detected_language, Language::En);
        assert_eq!(record.medicine_name.value_text(), "Panadol Extra");
        assert_eq!(record.quantity.value_text(), "20錠");
        assert!(outcome.front.as_ref().unwrap().raw_text.contains("Panadol"));
        assert!(!outcome.front.as_ref().unwrap().fallback_region_used);
    }

    #[tokio::test]
    async fn identical_submissions_yield_identical_records() {
        let id = Uuid::new_v4();
        let submission = Submission::new(png_bytes(64, 48))
            .with_back(png_bytes(64, 48))
            .with_id(id);

        let first = Setup::default()
            .orchestrator()
            .process(submission.clone())
            .await
            .unwrap();
        let second = Setup::default()
            .orchestrator()
            .process(submission)
            .await
            .unwrap();
        assert_eq!(first.record, second.record);
    }

    #[tokio::test]
    async fn empty_detection_falls_back_to_the_whole_image() {
        let setup = Setup {
            detector_regions: Vec::new(),
            ..Setup::default()
        };
        let outcome = setup
            .orchestrator()
            .process(Submission::new(png_bytes(64, 48)))
            .await
            .unwrap();

        assert!(outcome.front.as_ref().unwrap().fallback_region_used);
        assert_eq!(outcome.record.medicine_name.value_text(), "Panadol Extra");
    }

    #[tokio::test]
    async fn unknown_language_routes_to_the_default_engine() {
        let setup = Setup {
            // Raw confidence below the 0.5 threshold demotes the guess.
            guess: LanguageGuess::new(Language::En, 0.2),
            final_engine: StubRecognizer::lines("stub:eng", &[("Wrong Engine", 0.9)]),
            default_engine: StubRecognizer::lines("stub:default", &[("Default Engine", 0.9)]),
            ..Setup::default()
        };
        let outcome = setup
            .orchestrator()
            .process(Submission::new(png_bytes(64, 48)))
            .await
            .unwrap();

        assert_eq!(outcome.record.detected_language, Language::Unknown);
        assert_eq!(outcome.record.medicine_name.value_text(), "Default Engine");
    }

    #[tokio::test]
    async fn back_failure_still_returns_the_front_record() {
        // Both engines reject the larger back image, so its only region
        // exhausts the retry and the back run fails; the front survives.
        let setup = Setup {
            final_engine: StubRecognizer::failing_above("stub:eng", &label_lines(), 100),
            default_engine: StubRecognizer::failing_above("stub:default", &label_lines(), 100),
            ..Setup::default()
        };
        let submission = Submission::new(png_bytes(64, 48)).with_back(png_bytes(128, 96));
        let outcome = setup.orchestrator().process(submission).await.unwrap();

        assert_eq!(outcome.record.source, RecordSource::Front);
        assert!(outcome.front.is_some());
        assert!(outcome.back.is_none());
    }

    #[tokio::test]
    async fn merged_records_prefer_the_higher_confidence_field() {
        let outcome = Setup::default()
            .orchestrator()
            .process(Submission::new(png_bytes(64, 48)).with_back(png_bytes(64, 48)))
            .await
            .unwrap();

        assert_eq!(outcome.record.source, RecordSource::Merged);
        assert!(outcome.front.is_some());
        assert!(outcome.back.is_some());
        // Identical inputs tie on every field, so the front's values win.
        assert_eq!(
            outcome.record.medicine_name,
            outcome.front.unwrap().record.medicine_name
        );
    }

    #[tokio::test]
    async fn both_images_failing_fails_the_submission() {
        let setup = Setup {
            final_engine: StubRecognizer::failing_above("stub:eng", &label_lines(), 1),
            default_engine: StubRecognizer::failing_above("stub:default", &label_lines(), 1),
            ..Setup::default()
        };
        let submission = Submission::new(png_bytes(64, 48)).with_back(png_bytes(64, 48));
        let failure = setup.orchestrator().process(submission).await.unwrap_err();
        assert_eq!(failure.stage, PipelineStage::Recognition);
    }

    #[tokio::test]
    async fn invalid_image_bytes_fail_at_normalization() {
        let orchestrator = Setup::default().orchestrator();
        let failure = orchestrator
            .process(Submission::new(b"definitely not an image".to_vec()))
            .await
            .unwrap_err();
        assert_eq!(failure.stage, PipelineStage::Normalization);
        assert!(matches!(failure.error, PipelineError::InvalidImage { .. }));
    }

    #[tokio::test]
    async fn recognition_timeouts_exhaust_the_retry() {
        let mut config = PipelineConfig::default();
        config.timeouts.final_ocr_ms = 40;
        let setup = Setup {
            final_engine: StubRecognizer::sleeping("stub:eng", Duration::from_millis(400)),
            default_engine: StubRecognizer::sleeping("stub:default", Duration::from_millis(400)),
            config,
            ..Setup::default()
        };
        let failure = setup
            .orchestrator()
            .process(Submission::new(png_bytes(64, 48)))
            .await
            .unwrap_err();

        assert_eq!(failure.stage, PipelineStage::Recognition);
        assert!(matches!(failure.error, PipelineError::OcrFailed { .. }));
    }

    #[test]
    fn run_states_advance_in_order() {
        let sequence = [
            RunState::Received,
            RunState::Normalized,
            RunState::Detected,
            RunState::LanguageIdentified,
            RunState::Recognized,
            RunState::Extracted,
            RunState::Complete,
        ];
        for pair in sequence.windows(2) {
            assert!(pair[0].can_advance_to(&pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(!RunState::Received.can_advance_to(&RunState::Detected));
        assert!(!RunState::Complete.can_advance_to(&RunState::Received));
    }

    #[test]
    fn failed_is_reachable_from_any_non_terminal_state() {
        let failed = RunState::Failed {
            stage: PipelineStage::Recognition,
            reason: "x".to_string(),
        };
        for state in [
            RunState::Received,
            RunState::Normalized,
            RunState::Detected,
            RunState::LanguageIdentified,
            RunState::Recognized,
            RunState::Extracted,
        ] {
            assert!(state.can_advance_to(&failed), "{state}");
        }
        assert!(!RunState::Complete.can_advance_to(&failed));
        assert!(!failed.can_advance_to(&RunState::Received));
    }
}
