/// SCRFD face detector (InsightFace `det_10g`) using ONNX Runtime via `ort`.
///
/// Handles aspect-preserving resize, inference, anchor-centre distance
/// decoding across three strides, and NMS post-processing.
use std::path::Path;
use std::sync::Mutex;

use crate::shared::constants::LANDMARK_COUNT;
use crate::shared::image::Image;

use super::math;
use super::onnx_session;

/// Fallback input resolution when the model input is dynamic.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default minimum face score.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Default NMS IoU threshold.
pub const DEFAULT_NMS_IOU: f64 = 0.4;

/// Feature-map strides, in output order.
const STRIDES: [usize; 3] = [8, 16, 32];

/// Anchors per feature-map cell.
const NUM_ANCHORS: usize = 2;

const INPUT_MEAN: f32 = 127.5;
const INPUT_STD: f32 = 128.0;

/// A decoded face candidate in source-image coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFace {
    pub bbox: [f64; 4],
    pub score: f32,
    pub keypoints: [(f64, f64); LANDMARK_COUNT],
}

pub struct ScrfdDetector {
    session: Mutex<ort::session::Session>,
    input_size: u32,
    confidence: f32,
    nms_iou: f64,
}

impl ScrfdDetector {
    pub fn new(
        model_path: &Path,
        confidence: f32,
        nms_iou: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = onnx_session::open_session(model_path)?;
        let input_size = onnx_session::declared_input_size(&session).unwrap_or(DEFAULT_INPUT_SIZE);
        Ok(Self {
            session: Mutex::new(session),
            input_size,
            confidence,
            nms_iou,
        })
    }

    pub fn detect(&self, image: &Image) -> Result<Vec<RawFace>, Box<dyn std::error::Error>> {
        // 1. Preprocess: resize into the top-left of the square canvas
        let (tensor, scale) = letterbox(image, self.input_size);

        // 2. Inference; copy every output out before the gate is released
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let heads: Vec<Vec<f32>> = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| format!("Lock poisoned: {e}"))?;
            let outputs = session.run(ort::inputs![input_value])?;
            if outputs.len() < STRIDES.len() * 3 {
                return Err(format!(
                    "SCRFD model produced {} outputs, expected {} (model without keypoints?)",
                    outputs.len(),
                    STRIDES.len() * 3
                )
                .into());
            }
            (0..STRIDES.len() * 3)
                .map(|i| {
                    outputs[i]
                        .try_extract_array::<f32>()
                        .map(|a| a.iter().copied().collect::<Vec<f32>>())
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        // 3. Decode
        let mut candidates = Vec::new();
        for (level, &stride) in STRIDES.iter().enumerate() {
            let scores = &heads[level];
            let boxes = &heads[level + STRIDES.len()];
            let kps = &heads[level + STRIDES.len() * 2];
            candidates.extend(decode_level(
                scores,
                boxes,
                kps,
                stride,
                self.input_size as usize,
                self.confidence,
            )?);
        }

        // 4. Map back to source coordinates
        for face in &mut candidates {
            for v in &mut face.bbox {
                *v /= scale;
            }
            for (x, y) in &mut face.keypoints {
                *x /= scale;
                *y /= scale;
            }
        }

        // 5. NMS
        Ok(math::nms(&mut candidates, self.nms_iou, |f| (f.bbox, f.score)))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize `image` preserving aspect ratio into the top-left corner of a
/// `target_size` square; the rest stays black.
///
/// Returns `(NCHW float32 tensor, scale)`.
fn letterbox(image: &Image, target_size: u32) -> (ndarray::Array4<f32>, f64) {
    let iw = image.width() as f64;
    let ih = image.height() as f64;
    let target = target_size as f64;

    let scale = (target / iw).min(target / ih);
    let new_w = ((iw * scale).round() as usize).clamp(1, target_size as usize);
    let new_h = ((ih * scale).round() as usize).clamp(1, target_size as usize);

    let pad = (0.0 - INPUT_MEAN) / INPUT_STD;
    let mut tensor = ndarray::Array4::<f32>::from_elem(
        (1, 3, target_size as usize, target_size as usize),
        pad,
    );

    let src = image.as_ndarray();
    let src_h = image.height() as usize;
    let src_w = image.width() as usize;

    // Nearest-neighbour resize sampled at pixel centres
    for y in 0..new_h {
        let src_y = (((y as f64 + 0.5) / scale) as usize).min(src_h - 1);
        for x in 0..new_w {
            let src_x = (((x as f64 + 0.5) / scale) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[src_y, src_x, c]] as f32 - INPUT_MEAN) / INPUT_STD;
            }
        }
    }

    (tensor, scale)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode one stride level. Box and keypoint heads are distances from the
/// anchor centre in units of the stride.
fn decode_level(
    scores: &[f32],
    boxes: &[f32],
    kps: &[f32],
    stride: usize,
    input_size: usize,
    confidence: f32,
) -> Result<Vec<RawFace>, String> {
    let cells = input_size / stride;
    let anchors = cells * cells * NUM_ANCHORS;
    if scores.len() != anchors
        || boxes.len() != anchors * 4
        || kps.len() != anchors * LANDMARK_COUNT * 2
    {
        return Err(format!(
            "stride {stride}: unexpected head sizes {}/{}/{} for {anchors} anchors",
            scores.len(),
            boxes.len(),
            kps.len()
        ));
    }

    let s = stride as f64;
    let mut faces = Vec::new();
    for (idx, &score) in scores.iter().enumerate() {
        if score < confidence {
            continue;
        }
        let cell = idx / NUM_ANCHORS;
        let cx = (cell % cells) as f64 * s;
        let cy = (cell / cells) as f64 * s;

        let b = &boxes[idx * 4..idx * 4 + 4];
        let bbox = [
            cx - b[0] as f64 * s,
            cy - b[1] as f64 * s,
            cx + b[2] as f64 * s,
            cy + b[3] as f64 * s,
        ];

        let k = &kps[idx * LANDMARK_COUNT * 2..(idx + 1) * LANDMARK_COUNT * 2];
        let mut keypoints = [(0.0, 0.0); LANDMARK_COUNT];
        for (i, p) in keypoints.iter_mut().enumerate() {
            *p = (cx + k[i * 2] as f64 * s, cy + k[i * 2 + 1] as f64 * s);
        }

        faces.push(RawFace {
            bbox,
            score,
            keypoints,
        });
    }
    Ok(faces)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
