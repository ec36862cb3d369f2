use crate::shared::image::Image;
use crate::shared::region::Region;

/// A rendered face patch and where it came from.
///
/// `source_region` is the padded crop window in source-image pixels; the
/// patch has exactly its dimensions. The identity embedding rides along so
/// downstream consumers need not re-run detection.
#[derive(Clone, Debug, PartialEq)]
pub struct StyledFace {
    pub image: Image,
    pub source_region: Region,
    pub embedding: Vec<f32>,
}
