use crate::shared::error::CompositeFailure;
use crate::shared::image::Image;
use crate::shared::region::Region;
use crate::stylizing::domain::styled_face::StyledFace;

use super::composite_result::CompositeResult;

/// Domain interface for blending a styled face into a template.
///
/// A target that only partly overlaps the destination is clamped and flagged
/// via `CompositeResult::out_of_bounds`; only a target with no usable pixels
/// is an error. Pixels outside the target are never touched.
pub trait Compositor: Send + Sync {
    fn composite(
        &self,
        face: &StyledFace,
        destination: &Image,
        target: Region,
    ) -> Result<CompositeResult, CompositeFailure>;
}
