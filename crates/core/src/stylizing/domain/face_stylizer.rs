use crate::detection::domain::detection::Detection;
use crate::shared::error::StylizationFailure;
use crate::shared::image::Image;

use super::styled_face::StyledFace;

/// Domain interface for rendering one detected face as a cartoon patch.
///
/// Never mutates `image`. Output dimensions equal the padded, clamped
/// face region.
pub trait FaceStylizer: Send + Sync {
    fn stylize(&self, image: &Image, detection: &Detection) -> Result<StyledFace, StylizationFailure>;
}
