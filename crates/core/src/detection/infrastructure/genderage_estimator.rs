/// Coarse age and gender from the InsightFace `genderage` attribute model.
use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::detection::{BoundingBox, Gender};
use crate::shared::image::Image;

use super::alignment::{self, SimilarityTransform};
use super::onnx_session;

const INPUT_SIZE: u32 = 96;

/// Crop side relative to the larger bounding-box side.
const CROP_EXPANSION: f64 = 1.5;

pub struct GenderAgeEstimator {
    session: Mutex<ort::session::Session>,
}

impl GenderAgeEstimator {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = onnx_session::open_session(model_path)?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }

    pub fn estimate(
        &self,
        image: &Image,
        bbox: &BoundingBox,
    ) -> Result<(u32, Gender), Box<dyn std::error::Error>> {
        let crop = crop_for_attributes(image, bbox);
        let tensor = preprocess(&crop);
        let input_value = ort::value::Tensor::from_array(tensor)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        let pred: Vec<f32> = outputs[0].try_extract_array::<f32>()?.iter().copied().collect();
        decode(&pred).ok_or_else(|| format!("genderage output has {} values", pred.len()).into())
    }
}

/// Square crop centred on the box, scaled so the box fills 1/1.5 of it.
fn crop_for_attributes(image: &Image, bbox: &BoundingBox) -> Image {
    let side = bbox.width().max(bbox.height()).max(1.0) * CROP_EXPANSION;
    let scale = INPUT_SIZE as f64 / side;
    let half = INPUT_SIZE as f64 / 2.0;
    let transform = SimilarityTransform::scale_about(bbox.center(), scale, (half, half));
    alignment::warp(image, &transform, INPUT_SIZE, INPUT_SIZE)
}

/// Raw RGB values, no normalisation (the model normalises internally).
fn preprocess(crop: &Image) -> ndarray::Array4<f32> {
    let size = INPUT_SIZE as usize;
    let src = crop.as_ndarray();
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, size, size));
    for y in 0..size {
        for x in 0..size {
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[y, x, c]] as f32;
            }
        }
    }
    tensor
}

/// `[female_logit, male_logit, age / 100]`.
fn decode(pred: &[f32]) -> Option<(u32, Gender)> {
    if pred.len() < 3 {
        return None;
    }
    let gender = if pred[1] > pred[0] {
        Gender::Male
    } else {
        Gender::Female
    };
    let age = (pred[2] * 100.0).round().max(0.0) as u32;
    Some((age, gender))
}
