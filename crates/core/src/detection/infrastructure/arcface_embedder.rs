/// ArcFace identity embeddings (InsightFace `w600k_r50`) using ONNX Runtime.
///
/// Faces are aligned to the 112x112 ArcFace template first; the resulting
/// vector is L2-normalised so dot products are cosine similarities.
use std::path::Path;
use std::sync::Mutex;

use crate::shared::image::Image;

use super::alignment::{self, ARCFACE_SIZE};
use super::onnx_session;

const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct ArcFaceEmbedder {
    session: Mutex<ort::session::Session>,
}

impl ArcFaceEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = onnx_session::open_session(model_path)?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }

    pub fn embed(
        &self,
        image: &Image,
        landmarks: &[(f64, f64); 5],
    ) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let aligned = alignment::align_for_recognition(image, landmarks)
            .ok_or("Landmarks are degenerate; cannot align face")?;
        let tensor = preprocess(&aligned);
        let input_value = ort::value::Tensor::from_array(tensor)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;

        let mut embedding: Vec<f32> = embedding_array.iter().copied().collect();
        l2_normalize(&mut embedding);
        Ok(embedding)
    }
}

/// Aligned 112x112 crop to normalised NCHW.
fn preprocess(aligned: &Image) -> ndarray::Array4<f32> {
    let size = ARCFACE_SIZE as usize;
    debug_assert_eq!(aligned.width() as usize, size);
    let src = aligned.as_ndarray();
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, size, size));
    for y in 0..size {
        for x in 0..size {
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[y, x, c]] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }
    tensor
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize_unit_vector() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_preprocess_shape() {
        let tensor = preprocess(&Image::filled(112, 112, [128, 128, 128]));
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
    }

    #[test]
    fn test_preprocess_normalization_range() {
        let white = preprocess(&Image::filled(112, 112, [255, 255, 255]));
        let black = preprocess(&Image::filled(112, 112, [0, 0, 0]));
        assert!((white[[0, 0, 0, 0]] - 1.0).abs() < 0.01);
        assert!((black[[0, 2, 5, 5]] - (-1.0)).abs() < 0.01);
    }
}
