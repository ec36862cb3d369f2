use serde::{Deserialize, Serialize};

use super::detection::{Detection, DetectionSet};

/// Which face of a multi-face photo gets stylized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceSelection {
    /// Largest bounding-box area; ties go to the first one found.
    #[default]
    Largest,
}

impl FaceSelection {
    pub fn select<'a>(&self, set: &'a DetectionSet) -> Option<&'a Detection> {
        match self {
            FaceSelection::Largest => {
                let mut best: Option<&Detection> = None;
                for d in set.detections() {
                    if best.map_or(true, |b| d.bbox.area() > b.bbox.area()) {
                        best = Some(d);
                    }
                }
                best
            }
        }
    }
}
