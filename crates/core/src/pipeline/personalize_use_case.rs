use std::sync::Arc;
use std::time::Instant;

use crate::compositing::domain::composite_result::CompositeResult;
use crate::compositing::domain::compositor::Compositor;
use crate::detection::domain::face_locator::FaceLocator;
use crate::detection::domain::face_selection::FaceSelection;
use crate::shared::error::PipelineFailure;
use crate::shared::image::Image;
use crate::shared::image_codec;
use crate::stylizing::domain::face_stylizer::FaceStylizer;

use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::pipeline_state::PipelineState;
use super::target_region::TargetRegionPolicy;

/// Successful run: the encoded PNG plus where the face was blended.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub png: Vec<u8>,
    pub composite: CompositeResult,
}

/// Everything a caller learns from one request.
#[derive(Debug)]
pub struct PipelineRun {
    /// Every state entered, starting with `Received`.
    pub trace: Vec<PipelineState>,
    pub outcome: Result<PipelineOutput, PipelineFailure>,
}

impl PipelineRun {
    /// Terminal state of the run.
    pub fn state(&self) -> PipelineState {
        self.trace
            .last()
            .copied()
            .unwrap_or(PipelineState::Received)
    }

    pub fn is_done(&self) -> bool {
        self.state() == PipelineState::Done
    }
}

/// Orchestrator policy: which face, and where in the template.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonalizeOptions {
    pub selection: FaceSelection,
    pub target_region: TargetRegionPolicy,
    pub min_target_size: u32,
}

/// Photo + template → personalized illustration:
/// decode → locate → select → stylize → composite → encode.
///
/// Single-threaded per request and stateless between requests, so one
/// instance may serve many threads. Failures are terminal; nothing is retried.
pub struct PersonalizeUseCase {
    locator: Box<dyn FaceLocator>,
    stylizer: Box<dyn FaceStylizer>,
    compositor: Box<dyn Compositor>,
    options: PersonalizeOptions,
    logger: Arc<dyn PipelineLogger>,
}

impl PersonalizeUseCase {
    pub fn new(
        locator: Box<dyn FaceLocator>,
        stylizer: Box<dyn FaceStylizer>,
        compositor: Box<dyn Compositor>,
        options: PersonalizeOptions,
    ) -> Self {
        Self {
            locator,
            stylizer,
            compositor,
            options,
            logger: Arc::new(NullPipelineLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn process(&self, source: &[u8], template: &[u8]) -> PipelineRun {
        let mut tracker = StateTracker::new(&*self.logger);
        let outcome = self.advance(&mut tracker, source, template);
        if let Err(failure) = &outcome {
            log::warn!("Personalization failed: {failure}");
            tracker.enter(PipelineState::Failed(failure.reason()));
        }
        PipelineRun {
            trace: tracker.trace,
            outcome,
        }
    }

    fn advance(
        &self,
        tracker: &mut StateTracker<'_>,
        source: &[u8],
        template: &[u8],
    ) -> Result<PipelineOutput, PipelineFailure> {
        let photo = decode("source", source)?;
        let template = decode("template", template)?;

        // Received → Located
        let detections = self.timed("locate", || self.locator.locate(&photo))?;
        if detections.is_empty() {
            return Err(PipelineFailure::NoFaceDetected);
        }
        tracker.enter(PipelineState::Located);

        // Located → Styled
        let face = self
            .options
            .selection
            .select(&detections)
            .ok_or(PipelineFailure::NoFaceDetected)?;
        log::debug!(
            "Selected face at {:?} (score {:.2}) of {} found",
            face.bbox,
            face.score,
            detections.len()
        );
        let styled = self.timed("stylize", || self.stylizer.stylize(&photo, face))?;
        tracker.enter(PipelineState::Styled);

        // Styled → Composited
        let target = self
            .options
            .target_region
            .resolve(template.width(), template.height());
        let min = self.options.min_target_size as i32;
        if target.width < min || target.height < min {
            return Err(PipelineFailure::TemplateTooSmall(format!(
                "target region {}x{} on a {}x{} template is below the {min}px minimum",
                target.width,
                target.height,
                template.width(),
                template.height()
            )));
        }
        let composite = self.timed("composite", || {
            self.compositor.composite(&styled, &template, target)
        })?;
        if composite.out_of_bounds {
            return Err(PipelineFailure::TemplateTooSmall(format!(
                "target region {:?} extends beyond the {}x{} template",
                composite.requested,
                template.width(),
                template.height()
            )));
        }
        tracker.enter(PipelineState::Composited);

        // Composited → Done
        let png = self
            .timed("encode", || image_codec::encode_png(&composite.image))
            .map_err(|e| PipelineFailure::EncodingError(e.to_string()))?;
        tracker.enter(PipelineState::Done);

        Ok(PipelineOutput { png, composite })
    }

    fn timed<T>(&self, stage: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.logger
            .timing(stage, start.elapsed().as_secs_f64() * 1000.0);
        out
    }
}

fn decode(input: &'static str, bytes: &[u8]) -> Result<Image, PipelineFailure> {
    image_codec::decode(bytes).map_err(|e| PipelineFailure::InvalidImage {
        input,
        detail: e.to_string(),
    })
}

/// Records the transition trace and reports each edge.
struct StateTracker<'a> {
    trace: Vec<PipelineState>,
    logger: &'a dyn PipelineLogger,
}

impl<'a> StateTracker<'a> {
    fn new(logger: &'a dyn PipelineLogger) -> Self {
        Self {
            trace: vec![PipelineState::Received],
            logger,
        }
    }

    fn enter(&mut self, next: PipelineState) {
        let current = self.trace.last().copied().unwrap_or(PipelineState::Received);
        debug_assert!(
            current.can_advance_to(next),
            "illegal transition {current} -> {next}"
        );
        log::debug!("{current} -> {next}");
        self.logger.transition(current, next);
        self.trace.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::compositing::infrastructure::falloff_compositor::FalloffCompositor;
    use crate::compositing::infrastructure::falloff_mask::DEFAULT_CORE_FRACTION;
    use crate::detection::domain::detection::test_support::detection;
    use crate::detection::domain::detection::{Detection, DetectionSet};
    use crate::pipeline::pipeline_logger::TimingPipelineLogger;
    use crate::pipeline::settings::DEFAULT_MIN_TARGET_SIZE;
    use crate::shared::error::{
        CompositeFailure, DetectionFailure, FailureReason, StylizationFailure,
    };
    use crate::shared::region::Region;
    use crate::stylizing::domain::styled_face::StyledFace;
    use crate::stylizing::infrastructure::cartoon_stylizer::{CartoonParams, CartoonStylizer};

    // --- Stubs ---

    /// Returns canned detections, or none for an all-black photo.
    struct StubLocator {
        faces: Vec<Detection>,
    }

    impl FaceLocator for StubLocator {
        fn locate(&self, image: &Image) -> Result<DetectionSet, DetectionFailure> {
            let faces = if image.data().iter().all(|&v| v == 0) {
                Vec::new()
            } else {
                self.faces.clone()
            };
            Ok(DetectionSet::new(faces, image.width(), image.height()))
        }
    }

    struct FailingLocator;

    impl FaceLocator for FailingLocator {
        fn locate(&self, _image: &Image) -> Result<DetectionSet, DetectionFailure> {
            Err(DetectionFailure::Inference("session crashed".into()))
        }
    }

    /// Records which detection it was asked to stylize.
    struct RecordingStylizer {
        calls: Arc<Mutex<Vec<Detection>>>,
    }

    impl FaceStylizer for RecordingStylizer {
        fn stylize(
            &self,
            image: &Image,
            detection: &Detection,
        ) -> Result<StyledFace, StylizationFailure> {
            self.calls.lock().unwrap().push(detection.clone());
            let region = detection
                .bbox
                .padded_region(0.2, image.width(), image.height());
            Ok(StyledFace {
                image: Image::filled(region.width as u32, region.height as u32, [255, 0, 0]),
                source_region: region,
                embedding: detection.embedding.clone(),
            })
        }
    }

    /// Counts calls, then delegates to the real compositor.
    struct CountingCompositor {
        calls: Arc<Mutex<usize>>,
    }

    impl Compositor for CountingCompositor {
        fn composite(
            &self,
            face: &StyledFace,
            destination: &Image,
            target: Region,
        ) -> Result<CompositeResult, CompositeFailure> {
            *self.calls.lock().unwrap() += 1;
            FalloffCompositor::new(DEFAULT_CORE_FRACTION).composite(face, destination, target)
        }
    }

    fn options(target_region: TargetRegionPolicy) -> PersonalizeOptions {
        PersonalizeOptions {
            selection: FaceSelection::Largest,
            target_region,
            min_target_size: DEFAULT_MIN_TARGET_SIZE,
        }
    }

    fn real_use_case(faces: Vec<Detection>) -> PersonalizeUseCase {
        PersonalizeUseCase::new(
            Box::new(StubLocator { faces }),
            Box::new(CartoonStylizer::new(CartoonParams::default())),
            Box::new(FalloffCompositor::new(DEFAULT_CORE_FRACTION)),
            options(TargetRegionPolicy::default()),
        )
    }

    fn recording_use_case(
        faces: Vec<Detection>,
        target_region: TargetRegionPolicy,
    ) -> (PersonalizeUseCase, Arc<Mutex<Vec<Detection>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let use_case = PersonalizeUseCase::new(
            Box::new(StubLocator { faces }),
            Box::new(RecordingStylizer {
                calls: calls.clone(),
            }),
            Box::new(FalloffCompositor::new(DEFAULT_CORE_FRACTION)),
            options(target_region),
        );
        (use_case, calls)
    }

    /// Warm disc on a textured background, encoded as PNG.
    fn portrait_png(w: u32, h: u32) -> Vec<u8> {
        let (cx, cy, r) = (w as f64 / 2.0, h as f64 / 2.0, h as f64 / 4.0);
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                let d = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
                if d < r {
                    data.extend_from_slice(&[225, 180, 150]);
                } else {
                    data.extend_from_slice(&[(x % 64) as u8 + 30, 70, (y % 32) as u8 + 100]);
                }
            }
        }
        png(&Image::new(data, w, h))
    }

    fn png(image: &Image) -> Vec<u8> {
        image_codec::encode_png(image).unwrap()
    }

    fn centred_face() -> Detection {
        detection(260.0, 180.0, 380.0, 300.0)
    }

    fn template_color() -> [u8; 3] {
        [30, 140, 210]
    }

    // --- Scenarios ---

    #[test]
    fn test_single_centred_face_reaches_done() {
        let use_case = real_use_case(vec![centred_face()]);
        let template = png(&Image::filled(1024, 768, template_color()));

        let run = use_case.process(&portrait_png(640, 480), &template);

        assert_eq!(
            run.trace,
            vec![
                PipelineState::Received,
                PipelineState::Located,
                PipelineState::Styled,
                PipelineState::Composited,
                PipelineState::Done,
            ]
        );
        let output = run.outcome.unwrap();
        let decoded = image_codec::decode(&output.png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1024, 768));
        let target = Region::new(362, 234, 300, 300);
        assert_eq!(output.composite.region, target);

        for y in (0..768).step_by(5) {
            for x in (0..1024).step_by(5) {
                let inside = x >= target.x
                    && x < target.right()
                    && y >= target.y
                    && y < target.bottom();
                if !inside {
                    assert_eq!(decoded.pixel(x as u32, y as u32), template_color());
                }
            }
        }
        assert_ne!(decoded.pixel(512, 384), template_color());
    }

    #[test]
    fn test_empty_detection_set_fails_without_stylizing() {
        let (use_case, calls) = recording_use_case(
            vec![detection(10.0, 10.0, 60.0, 60.0)],
            TargetRegionPolicy::default(),
        );
        let black = png(&Image::filled(100, 100, [0, 0, 0]));
        let template = png(&Image::filled(1024, 768, template_color()));

        let run = use_case.process(&black, &template);

        assert_eq!(run.state(), PipelineState::Failed(FailureReason::NoFaceDetected));
        assert_eq!(
            run.trace,
            vec![
                PipelineState::Received,
                PipelineState::Failed(FailureReason::NoFaceDetected)
            ]
        );
        assert!(calls.lock().unwrap().is_empty());
        assert!(matches!(run.outcome, Err(PipelineFailure::NoFaceDetected)));
    }

    #[test]
    fn test_tiny_template_fails_as_too_small() {
        let use_case = real_use_case(vec![centred_face()]);
        let tiny = png(&Image::filled(10, 10, template_color()));

        let run = use_case.process(&portrait_png(640, 480), &tiny);

        assert_eq!(
            run.state(),
            PipelineState::Failed(FailureReason::TemplateTooSmall)
        );
        assert_eq!(
            run.trace[..3],
            [
                PipelineState::Received,
                PipelineState::Located,
                PipelineState::Styled
            ]
        );
    }

    #[test]
    fn test_fixed_region_leaving_template_fails_as_too_small() {
        let (use_case, _) = recording_use_case(
            vec![centred_face()],
            TargetRegionPolicy::Fixed(Region::new(900, 700, 300, 300)),
        );
        let template = png(&Image::filled(1024, 768, template_color()));

        let run = use_case.process(&portrait_png(640, 480), &template);

        assert!(matches!(run.outcome, Err(PipelineFailure::TemplateTooSmall(_))));
    }

    #[test]
    fn test_far_out_fixed_regions_fail_as_too_small() {
        let template = png(&Image::filled(64, 64, template_color()));
        for region in [
            Region::new(2_000_000_000, 0, 500_000_000, 100),
            Region::new(0, 0, 100_000, 100_000),
        ] {
            let (use_case, _) =
                recording_use_case(vec![centred_face()], TargetRegionPolicy::Fixed(region));

            let run = use_case.process(&portrait_png(640, 480), &template);

            assert_eq!(
                run.state(),
                PipelineState::Failed(FailureReason::TemplateTooSmall),
                "{region:?}"
            );
        }
    }

    #[test]
    fn test_face_outside_photo_fails_before_compositing() {
        let composites = Arc::new(Mutex::new(0));
        let use_case = PersonalizeUseCase::new(
            Box::new(StubLocator {
                faces: vec![detection(500.0, 500.0, 500.0, 500.0)],
            }),
            Box::new(CartoonStylizer::new(CartoonParams::default())),
            Box::new(CountingCompositor {
                calls: composites.clone(),
            }),
            options(TargetRegionPolicy::default()),
        );
        let template = png(&Image::filled(1024, 768, template_color()));

        let run = use_case.process(&portrait_png(100, 100), &template);

        assert_eq!(
            run.trace,
            vec![
                PipelineState::Received,
                PipelineState::Located,
                PipelineState::Failed(FailureReason::StylizationError),
            ]
        );
        assert!(matches!(
            run.outcome,
            Err(PipelineFailure::StylizationError(
                StylizationFailure::DegenerateRegion { .. }
            ))
        ));
        assert_eq!(*composites.lock().unwrap(), 0);
    }

    #[test]
    fn test_largest_face_selected_with_first_tie_winning() {
        let small = detection(0.0, 0.0, 40.0, 40.0);
        let mut first_big = detection(100.0, 100.0, 200.0, 200.0);
        first_big.score = 0.7;
        let mut second_big = detection(300.0, 100.0, 400.0, 200.0);
        second_big.score = 0.9;
        let (use_case, calls) = recording_use_case(
            vec![small, first_big.clone(), second_big],
            TargetRegionPolicy::default(),
        );
        let template = png(&Image::filled(1024, 768, template_color()));

        let run = use_case.process(&portrait_png(640, 480), &template);

        assert!(run.is_done());
        assert_eq!(calls.lock().unwrap().as_slice(), &[first_big]);
    }

    #[test]
    fn test_identical_inputs_give_identical_output() {
        let use_case = real_use_case(vec![centred_face()]);
        let photo = portrait_png(640, 480);
        let template = png(&Image::filled(1024, 768, template_color()));

        let a = use_case.process(&photo, &template).outcome.unwrap();
        let b = use_case.process(&photo, &template).outcome.unwrap();

        assert_eq!(a.png, b.png);
    }

    #[test]
    fn test_undecodable_source_is_invalid_image() {
        let (use_case, calls) =
            recording_use_case(vec![centred_face()], TargetRegionPolicy::default());
        let template = png(&Image::filled(64, 64, template_color()));

        let run = use_case.process(b"definitely not an image", &template);

        assert!(matches!(
            run.outcome,
            Err(PipelineFailure::InvalidImage { input: "source", .. })
        ));
        assert_eq!(run.trace.len(), 2);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_undecodable_template_is_invalid_image() {
        let (use_case, _) = recording_use_case(vec![centred_face()], TargetRegionPolicy::default());

        let run = use_case.process(&portrait_png(64, 48), &[0x89, b'P', b'N', b'G']);

        assert!(matches!(
            run.outcome,
            Err(PipelineFailure::InvalidImage { input: "template", .. })
        ));
    }

    #[test]
    fn test_inference_error_is_model_error() {
        let use_case = PersonalizeUseCase::new(
            Box::new(FailingLocator),
            Box::new(CartoonStylizer::new(CartoonParams::default())),
            Box::new(FalloffCompositor::new(DEFAULT_CORE_FRACTION)),
            options(TargetRegionPolicy::default()),
        );
        let template = png(&Image::filled(64, 64, template_color()));

        let run = use_case.process(&portrait_png(64, 48), &template);

        assert_eq!(run.state(), PipelineState::Failed(FailureReason::ModelError));
    }

    #[test]
    fn test_logger_sees_stage_timings_and_terminal_state() {
        let logger = Arc::new(TimingPipelineLogger::new());
        let use_case = real_use_case(vec![centred_face()]).with_logger(logger.clone());
        let template = png(&Image::filled(1024, 768, template_color()));

        use_case.process(&portrait_png(640, 480), &template);

        for stage in ["locate", "stylize", "composite", "encode"] {
            assert_eq!(logger.timings_for(stage).map(|t| t.len()), Some(1), "{stage}");
        }
        assert_eq!(logger.terminal_count(PipelineState::Done), 1);
    }
}
