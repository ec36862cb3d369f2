/// The loaded face-analysis bundle: detector, embedder, age/gender head.
///
/// Loading is expensive, so one handle is built at startup and shared by
/// `Arc` between every request. Each session gates its own inference.
use std::path::Path;

use crate::detection::domain::detection::{BoundingBox, Detection};
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::image::Image;
use crate::shared::model_resolver::ModelPaths;

use super::arcface_embedder::ArcFaceEmbedder;
use super::genderage_estimator::GenderAgeEstimator;
use super::scrfd_detector::ScrfdDetector;

pub struct FaceAnalysisModel {
    detector: ScrfdDetector,
    embedder: ArcFaceEmbedder,
    attributes: GenderAgeEstimator,
}

impl FaceAnalysisModel {
    pub fn load(
        paths: &ModelPaths,
        confidence: f32,
        nms_iou: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let detector = load_part("detector", &paths.detector, |p| {
            ScrfdDetector::new(p, confidence, nms_iou)
        })?;
        let embedder = load_part("embedding", &paths.embedding, ArcFaceEmbedder::new)?;
        let attributes = load_part("genderage", &paths.genderage, GenderAgeEstimator::new)?;
        log::info!("Face analysis model ready");
        Ok(Self {
            detector,
            embedder,
            attributes,
        })
    }

    /// Detect, then embed and classify every face. Detections are in
    /// source-image coordinates, unsorted.
    pub fn analyze(&self, image: &Image) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let raw = self.detector.detect(image)?;
        let mut detections = Vec::with_capacity(raw.len());
        for face in raw {
            let bbox = BoundingBox::new(face.bbox[0], face.bbox[1], face.bbox[2], face.bbox[3])
                .clamp(image.width(), image.height());
            let embedding = self.embedder.embed(image, &face.keypoints)?;
            let (age, gender) = self.attributes.estimate(image, &bbox)?;
            detections.push(Detection {
                bbox,
                landmarks: FaceLandmarks::new(face.keypoints),
                embedding,
                age,
                gender,
                score: face.score,
            });
        }
        Ok(detections)
    }
}

impl Drop for FaceAnalysisModel {
    fn drop(&mut self) {
        log::info!("Face analysis model released");
    }
}

fn load_part<T>(
    label: &str,
    path: &Path,
    open: impl FnOnce(&Path) -> Result<T, Box<dyn std::error::Error>>,
) -> Result<T, Box<dyn std::error::Error>> {
    log::debug!("Loading {label} model from {}", path.display());
    open(path).map_err(|e| format!("failed to load {label} model {}: {e}", path.display()).into())
}
