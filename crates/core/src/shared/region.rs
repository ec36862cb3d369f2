use serde::{Deserialize, Serialize};

/// An integer pixel rectangle: the crop window of a face or the target
/// area inside a template.
///
/// Coordinates may be negative or exceed an image before clamping; callers
/// decide whether leaving the image is acceptable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Saturates at `i32::MAX`.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// True when both far edges are representable without saturating.
    pub fn edges_in_range(&self) -> bool {
        self.x.checked_add(self.width).is_some() && self.y.checked_add(self.height).is_some()
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// True when the whole rectangle lies inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() <= width as i32
            && self.bottom() <= height as i32
    }

    /// Intersection with a `width` x `height` image; zero-sized when disjoint.
    pub fn clamp_to(&self, width: u32, height: u32) -> Region {
        let x1 = self.x.clamp(0, width as i32);
        let y1 = self.y.clamp(0, height as i32);
        let x2 = self.right().clamp(0, width as i32);
        let y2 = self.bottom().clamp(0, height as i32);
        Region::new(x1, y1, (x2 - x1).max(0), (y2 - y1).max(0))
    }

    /// A `width` x `height` rectangle centered inside a `outer_w` x `outer_h` image.
    pub fn centered(outer_w: u32, outer_h: u32, width: i32, height: i32) -> Region {
        let x = (outer_w as i32 - width) / 2;
        let y = (outer_h as i32 - height) / 2;
        Region::new(x, y, width, height)
    }
}
