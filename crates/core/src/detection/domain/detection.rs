use serde::Serialize;

use crate::shared::region::Region;

use super::face_landmarks::FaceLandmarks;

/// Face bounding box `(x1, y1, x2, y2)` in source-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Clamp every corner into a `width` x `height` image.
    pub fn clamp(&self, width: u32, height: u32) -> BoundingBox {
        let (w, h) = (width as f64, height as f64);
        BoundingBox {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
        }
    }

    /// Pixel crop window grown by `fraction` of the box size on every side,
    /// clamped to the image. May come back degenerate.
    pub fn padded_region(&self, fraction: f64, width: u32, height: u32) -> Region {
        let pad_x = self.width() * fraction;
        let pad_y = self.height() * fraction;
        let x1 = (self.x1 - pad_x).floor().max(0.0) as i32;
        let y1 = (self.y1 - pad_y).floor().max(0.0) as i32;
        let x2 = ((self.x2 + pad_x).ceil() as i32).min(width as i32);
        let y2 = ((self.y2 + pad_y).ceil() as i32).min(height as i32);
        Region::new(x1, y1, (x2 - x1).max(0), (y2 - y1).max(0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

/// One located face.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub landmarks: FaceLandmarks,
    pub embedding: Vec<f32>,
    pub age: u32,
    pub gender: Gender,
    pub score: f32,
}

/// Every face found in one image, largest bounding box first.
///
/// An empty set is a normal outcome, not an error.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectionSet {
    detections: Vec<Detection>,
    image_width: u32,
    image_height: u32,
}

impl DetectionSet {
    /// Orders by descending area. The sort is stable, so equal areas keep
    /// the order they were found in.
    pub fn new(mut detections: Vec<Detection>, image_width: u32, image_height: u32) -> Self {
        detections.sort_by(|a, b| b.bbox.area().total_cmp(&a.bbox.area()));
        Self {
            detections,
            image_width,
            image_height,
        }
    }

    pub fn empty(image_width: u32, image_height: u32) -> Self {
        Self::new(Vec::new(), image_width, image_height)
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn image_shape(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }
}
