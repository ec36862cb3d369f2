use std::sync::Arc;

use crate::detection::domain::detection::DetectionSet;
use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::error::DetectionFailure;
use crate::shared::image::{Image, RGB_CHANNELS};

use super::face_analysis_model::FaceAnalysisModel;

/// `FaceLocator` backed by the shared InsightFace model bundle.
pub struct InsightFaceLocator {
    model: Arc<FaceAnalysisModel>,
}

impl InsightFaceLocator {
    pub fn new(model: Arc<FaceAnalysisModel>) -> Self {
        Self { model }
    }
}

impl FaceLocator for InsightFaceLocator {
    fn locate(&self, image: &Image) -> Result<DetectionSet, DetectionFailure> {
        check_input(image)?;
        let detections = self
            .model
            .analyze(image)
            .map_err(|e| DetectionFailure::Inference(e.to_string()))?;

        for (i, d) in detections.iter().enumerate() {
            if !d.landmarks.is_near_frontal() {
                log::debug!(
                    "Face {i} is turned (profile ratio {:.2}); landmarks may be unreliable",
                    d.landmarks.profile_ratio()
                );
            }
        }

        let set = DetectionSet::new(detections, image.width(), image.height());
        log::debug!(
            "Located {} face(s) in {}x{} image",
            set.len(),
            image.width(),
            image.height()
        );
        Ok(set)
    }
}

fn check_input(image: &Image) -> Result<(), DetectionFailure> {
    if image.is_empty() {
        return Err(DetectionFailure::MalformedImage(format!(
            "image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }
    if image.channels() != RGB_CHANNELS {
        return Err(DetectionFailure::MalformedImage(format!(
            "expected {RGB_CHANNELS} channels, got {}",
            image.channels()
        )));
    }
    Ok(())
}
