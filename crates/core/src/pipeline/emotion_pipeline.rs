use std::time::Instant;

use thiserror::Error;

use crate::classification::domain::emotion_classifier::EmotionClassifier;
use crate::detection::domain::face_localizer::FaceLocalizer;
use crate::detection::domain::landmarks::LandmarkSet;
use crate::detection::domain::region_cropper::{self, CropError};
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::preprocessing::domain::tensor_preprocessor::TensorPreprocessor;
use crate::presentation::probability_renderer::{softmax, Probabilities};
use crate::shared::frame::Frame;

/// What to do with a tick whose face crop could not be produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CropRecovery {
    /// Re-show the previous result, marked stale.
    #[default]
    ReuseLast,
    /// Drop the tick.
    SkipFrame,
    /// Classify the uncropped frame instead.
    FullFrame,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    pub crop_recovery: CropRecovery,
}

/// Why the face crop for a tick is missing.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum CropFailure {
    #[error("no face found")]
    NoFace,
    #[error(transparent)]
    Crop(#[from] CropError),
}

/// Result of one pipeline pass.
///
/// `crop` is the image that was classified when face cropping is on.
#[derive(Clone, Debug)]
pub enum TickOutcome {
    Fresh {
        probabilities: Probabilities,
        crop: Option<Frame>,
    },
    Stale {
        probabilities: Probabilities,
        crop: Option<Frame>,
        reason: CropFailure,
    },
    Skipped {
        reason: CropFailure,
    },
}

impl TickOutcome {
    pub fn probabilities(&self) -> Option<&Probabilities> {
        match self {
            Self::Fresh { probabilities, .. } | Self::Stale { probabilities, .. } => {
                Some(probabilities)
            }
            Self::Skipped { .. } => None,
        }
    }
}

/// Capture-independent stages of one tick:
/// localize → crop → preprocess → infer → softmax.
///
/// Runs synchronously; each stage consumes the previous stage's output.
pub struct EmotionPipeline {
    localizer: Option<Box<dyn FaceLocalizer>>,
    preprocessor: Box<dyn TensorPreprocessor>,
    classifier: Box<dyn EmotionClassifier>,
    config: PipelineConfig,
    logger: Box<dyn PipelineLogger>,
    last_result: Option<(Probabilities, Option<Frame>)>,
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

impl EmotionPipeline {
    /// Without a localizer every frame is classified whole.
    pub fn new(
        localizer: Option<Box<dyn FaceLocalizer>>,
        preprocessor: Box<dyn TensorPreprocessor>,
        classifier: Box<dyn EmotionClassifier>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            localizer,
            preprocessor,
            classifier,
            config,
            logger: Box::new(NullPipelineLogger),
            last_result: None,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn run_tick(&mut self, frame: &Frame) -> Result<TickOutcome, Box<dyn std::error::Error>> {
        self.logger.tick(frame.index());

        let crop = match self.localizer.as_mut() {
            None => return self.classify(frame, None),
            Some(localizer) => {
                let start = Instant::now();
                let landmarks = localizer.locate(frame)?;
                self.logger.timing("localize", elapsed_ms(start));
                locate_crop(frame, landmarks.as_ref())
            }
        };

        match crop {
            Ok(face) => self.classify(&face, Some(face.clone())),
            Err(reason) => self.recover(frame, reason),
        }
    }

    fn classify(
        &mut self,
        image: &Frame,
        crop: Option<Frame>,
    ) -> Result<TickOutcome, Box<dyn std::error::Error>> {
        let start = Instant::now();
        let tensor = self.preprocessor.preprocess(image)?;
        self.logger.timing("preprocess", elapsed_ms(start));

        let start = Instant::now();
        let scores = self.classifier.infer(&tensor)?;
        self.logger.timing("infer", elapsed_ms(start));

        let probabilities = softmax(&scores);
        let (label, p) = probabilities.dominant();
        log::debug!("Frame {}: {label} ({p:.2})", image.index());

        self.last_result = Some((probabilities, crop.clone()));
        Ok(TickOutcome::Fresh {
            probabilities,
            crop,
        })
    }

    fn recover(
        &mut self,
        frame: &Frame,
        reason: CropFailure,
    ) -> Result<TickOutcome, Box<dyn std::error::Error>> {
        log::debug!("Frame {}: crop unavailable ({reason})", frame.index());
        self.logger.count("crop_failed");

        match self.config.crop_recovery {
            CropRecovery::FullFrame => self.classify(frame, None),
            CropRecovery::ReuseLast => match &self.last_result {
                Some((probabilities, crop)) => {
                    self.logger.count("stale");
                    Ok(TickOutcome::Stale {
                        probabilities: *probabilities,
                        crop: crop.clone(),
                        reason,
                    })
                }
                None => {
                    self.logger.count("skipped");
                    Ok(TickOutcome::Skipped { reason })
                }
            },
            CropRecovery::SkipFrame => {
                self.logger.count("skipped");
                Ok(TickOutcome::Skipped { reason })
            }
        }
    }

    /// Emit the logger's end-of-session summary.
    pub fn summary(&self) {
        self.logger.summary();
    }
}

fn locate_crop(
    frame: &Frame,
    landmarks: Option<&LandmarkSet>,
) -> Result<Frame, CropFailure> {
    let landmarks = landmarks.ok_or(CropFailure::NoFace)?;
    let region = region_cropper::compute_crop(landmarks, frame.width(), frame.height())
        .map_err(CropFailure::Crop)?;
    let (fw, fh) = (frame.width(), frame.height());
    region_cropper::extract(frame, &region).ok_or(CropFailure::Crop(CropError::OutOfBounds {
        region,
        frame_width: fw,
        frame_height: fh,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::domain::class_scores::ClassScores;
    use crate::detection::domain::landmarks::{
        Landmark, FACE_CENTER, LEFT_EYE_OUTER, RIGHT_EYE_OUTER,
    };
    use crate::preprocessing::domain::input_tensor::InputTensor;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    /// Returns queued answers in order; `None` entries mean "no face".
    struct StubLocalizer {
        answers: VecDeque<Option<LandmarkSet>>,
    }

    impl FaceLocalizer for StubLocalizer {
        fn locate(
            &mut self,
            _frame: &Frame,
        ) -> Result<Option<LandmarkSet>, Box<dyn std::error::Error>> {
            Ok(self.answers.pop_front().flatten())
        }
    }

    /// Records the size of every image it is asked to preprocess.
    struct RecordingPreprocessor {
        seen: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl TensorPreprocessor for RecordingPreprocessor {
        fn preprocess(&self, frame: &Frame) -> Result<InputTensor, Box<dyn std::error::Error>> {
            self.seen.lock().unwrap().push((frame.width(), frame.height()));
            Ok(InputTensor::zeros())
        }
    }

    /// Returns queued logits in order.
    struct StubClassifier {
        scores: VecDeque<[f32; 8]>,
    }

    impl EmotionClassifier for StubClassifier {
        fn infer(&mut self, _tensor: &InputTensor) -> Result<ClassScores, Box<dyn std::error::Error>> {
            let next = self.scores.pop_front().ok_or("no scores queued")?;
            Ok(ClassScores::new(next))
        }
    }

    struct FailingClassifier;

    impl EmotionClassifier for FailingClassifier {
        fn infer(&mut self, _tensor: &InputTensor) -> Result<ClassScores, Box<dyn std::error::Error>> {
            Err("session lost".into())
        }
    }

    // --- Helpers ---

    const HAPPY: [f32; 8] = [0.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    const SAD: [f32; 8] = [0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0];

    fn face_at(cx: f32, cy: f32) -> LandmarkSet {
        let mut points = vec![Landmark::new(0.0, 0.0, 0.0); 33];
        points[FACE_CENTER] = Landmark::new(cx, cy, 0.0);
        points[LEFT_EYE_OUTER] = Landmark::new(cx - 0.05, cy, 0.0);
        points[RIGHT_EYE_OUTER] = Landmark::new(cx + 0.05, cy, 0.0);
        LandmarkSet::new(points)
    }

    fn frame(index: usize) -> Frame {
        Frame::new(vec![100u8; 640 * 640 * 3], 640, 640, 3, index)
    }

    fn pipeline(
        answers: Vec<Option<LandmarkSet>>,
        scores: Vec<[f32; 8]>,
        recovery: CropRecovery,
    ) -> (EmotionPipeline, Arc<Mutex<Vec<(u32, u32)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let p = EmotionPipeline::new(
            Some(Box::new(StubLocalizer {
                answers: answers.into(),
            })),
            Box::new(RecordingPreprocessor { seen: seen.clone() }),
            Box::new(StubClassifier {
                scores: scores.into(),
            }),
            PipelineConfig {
                crop_recovery: recovery,
            },
        );
        (p, seen)
    }

    fn dominant(outcome: &TickOutcome) -> &'static str {
        outcome.probabilities().unwrap().dominant().0.as_str()
    }

    // --- Tests ---

    #[test]
    fn test_without_localizer_classifies_whole_frame() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut p = EmotionPipeline::new(
            None,
            Box::new(RecordingPreprocessor { seen: seen.clone() }),
            Box::new(StubClassifier {
                scores: vec![HAPPY].into(),
            }),
            PipelineConfig::default(),
        );
        let outcome = p.run_tick(&frame(0)).unwrap();
        assert!(matches!(outcome, TickOutcome::Fresh { crop: None, .. }));
        assert_eq!(dominant(&outcome), "Happiness");
        assert_eq!(*seen.lock().unwrap(), vec![(640, 640)]);
    }

    #[test]
    fn test_face_is_cropped_before_preprocessing() {
        let (mut p, seen) = pipeline(
            vec![Some(face_at(0.5, 0.5))],
            vec![HAPPY],
            CropRecovery::ReuseLast,
        );
        let outcome = p.run_tick(&frame(0)).unwrap();
        match outcome {
            TickOutcome::Fresh {
                crop: Some(crop), ..
            } => assert_eq!((crop.width(), crop.height()), (147, 147)),
            other => panic!("expected fresh crop, got {other:?}"),
        }
        assert_eq!(*seen.lock().unwrap(), vec![(147, 147)]);
    }

    #[test]
    fn test_reuse_last_returns_previous_result_as_stale() {
        let (mut p, seen) = pipeline(
            vec![Some(face_at(0.5, 0.5)), Some(face_at(0.02, 0.5))],
            vec![HAPPY, SAD],
            CropRecovery::ReuseLast,
        );
        p.run_tick(&frame(0)).unwrap();
        let outcome = p.run_tick(&frame(1)).unwrap();
        match &outcome {
            TickOutcome::Stale { crop, reason, .. } => {
                assert!(crop.is_some());
                assert!(matches!(reason, CropFailure::Crop(CropError::OutOfBounds { .. })));
            }
            other => panic!("expected stale, got {other:?}"),
        }
        assert_eq!(dominant(&outcome), "Happiness");
        // The failed tick never reached preprocessing.
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_reuse_last_without_history_skips() {
        let (mut p, _) = pipeline(vec![None], vec![], CropRecovery::ReuseLast);
        let outcome = p.run_tick(&frame(0)).unwrap();
        assert!(matches!(
            outcome,
            TickOutcome::Skipped {
                reason: CropFailure::NoFace
            }
        ));
    }

    #[test]
    fn test_skip_frame_drops_failed_tick() {
        let (mut p, _) = pipeline(
            vec![Some(face_at(0.5, 0.5)), None],
            vec![HAPPY],
            CropRecovery::SkipFrame,
        );
        p.run_tick(&frame(0)).unwrap();
        let outcome = p.run_tick(&frame(1)).unwrap();
        assert!(matches!(outcome, TickOutcome::Skipped { .. }));
        assert!(outcome.probabilities().is_none());
    }

    #[test]
    fn test_full_frame_classifies_uncropped_frame() {
        let (mut p, seen) = pipeline(
            vec![Some(face_at(0.95, 0.5))],
            vec![SAD],
            CropRecovery::FullFrame,
        );
        let outcome = p.run_tick(&frame(0)).unwrap();
        assert!(matches!(outcome, TickOutcome::Fresh { crop: None, .. }));
        assert_eq!(dominant(&outcome), "Sadness");
        assert_eq!(*seen.lock().unwrap(), vec![(640, 640)]);
    }

    #[test]
    fn test_fresh_result_replaces_stale_history() {
        let (mut p, _) = pipeline(
            vec![Some(face_at(0.5, 0.5)), Some(face_at(0.5, 0.5)), None],
            vec![HAPPY, SAD],
            CropRecovery::ReuseLast,
        );
        p.run_tick(&frame(0)).unwrap();
        p.run_tick(&frame(1)).unwrap();
        let outcome = p.run_tick(&frame(2)).unwrap();
        assert!(matches!(outcome, TickOutcome::Stale { .. }));
        assert_eq!(dominant(&outcome), "Sadness");
    }

    #[test]
    fn test_classifier_error_propagates() {
        let mut p = EmotionPipeline::new(
            None,
            Box::new(RecordingPreprocessor {
                seen: Arc::new(Mutex::new(Vec::new())),
            }),
            Box::new(FailingClassifier),
            PipelineConfig::default(),
        );
        let err = p.run_tick(&frame(0)).unwrap_err();
        assert_eq!(err.to_string(), "session lost");
    }

    #[test]
    fn test_crop_failure_display() {
        assert_eq!(CropFailure::NoFace.to_string(), "no face found");
        assert_eq!(
            CropFailure::Crop(CropError::Degenerate).to_string(),
            "landmarks produce an empty crop"
        );
    }

    #[test]
    fn test_crop_failure_wraps_crop_error() {
        let failure: CropFailure = CropError::Degenerate.into();
        assert_eq!(failure, CropFailure::Crop(CropError::Degenerate));
        let err: &dyn std::error::Error = &failure;
        assert_eq!(err.to_string(), "landmarks produce an empty crop");
    }
}
