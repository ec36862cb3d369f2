use serde::{Deserialize, Serialize};

use crate::shared::region::Region;

/// Default target is 300x300 on a 1024x768 template.
pub const DEFAULT_WIDTH_FRACTION: f64 = 300.0 / 1024.0;
pub const DEFAULT_HEIGHT_FRACTION: f64 = 300.0 / 768.0;

/// Where in a template the styled face goes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetRegionPolicy {
    /// Centred rectangle sized as a fraction of the template dimensions.
    Centered {
        width_fraction: f64,
        height_fraction: f64,
    },
    /// Explicit rectangle in template pixels, for templates with a
    /// designated face slot.
    Fixed(Region),
}

impl Default for TargetRegionPolicy {
    fn default() -> Self {
        TargetRegionPolicy::Centered {
            width_fraction: DEFAULT_WIDTH_FRACTION,
            height_fraction: DEFAULT_HEIGHT_FRACTION,
        }
    }
}

impl TargetRegionPolicy {
    /// Target rectangle for a `width` x `height` template. A fixed region
    /// is returned as is, even when it leaves the template.
    pub fn resolve(&self, width: u32, height: u32) -> Region {
        match *self {
            TargetRegionPolicy::Centered {
                width_fraction,
                height_fraction,
            } => {
                let w = (width as f64 * width_fraction).round() as i32;
                let h = (height as f64 * height_fraction).round() as i32;
                Region::centered(width, height, w, h)
            }
            TargetRegionPolicy::Fixed(region) => region,
        }
    }
}
