use crate::shared::image::Image;
use crate::shared::region::Region;

/// The blended template and where the blend happened.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeResult {
    pub image: Image,
    /// Destination pixels actually written, after clamping.
    pub region: Region,
    /// The requested target region as given by the caller.
    pub requested: Region,
    /// Part of `requested` fell outside the destination and was dropped.
    pub out_of_bounds: bool,
}
