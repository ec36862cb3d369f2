use crate::shared::error::DetectionFailure;
use crate::shared::image::Image;

use super::detection::DetectionSet;

/// Domain interface for finding faces.
///
/// Always returns every detection, largest first; choosing one is the
/// caller's policy. Zero faces is an empty `DetectionSet`, never an error.
/// Recall degrades for faces turned more than about 30 degrees from frontal.
///
/// `&self` so one locator can serve concurrent requests; implementations
/// holding mutable model state must gate it internally.
pub trait FaceLocator: Send + Sync {
    fn locate(&self, image: &Image) -> Result<DetectionSet, DetectionFailure>;
}
