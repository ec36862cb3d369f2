//! Soft elliptical opacity mask for seam-free blending.

use std::ops::Range;

/// Default share of the ellipse radius held at full opacity.
pub const DEFAULT_CORE_FRACTION: f64 = 0.6;

/// Row-major opacity map in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct FalloffMask {
    values: Vec<f32>,
    width: usize,
    height: usize,
}

impl FalloffMask {
    /// Opacity is 1.0 inside the core ellipse (`core_fraction` of the
    /// inscribed ellipse) and falls off as a Gaussian beyond it, reaching
    /// about 0.011 on the inscribed ellipse and less toward the corners.
    pub fn elliptical(width: usize, height: usize, core_fraction: f64) -> Self {
        Self::elliptical_window(width, height, core_fraction, 0..width, 0..height)
    }

    /// The `cols` x `rows` window of the `width` x `height` mask; `at` then
    /// takes window-local coordinates. Ranges are clipped to the mask.
    pub fn elliptical_window(
        width: usize,
        height: usize,
        core_fraction: f64,
        cols: Range<usize>,
        rows: Range<usize>,
    ) -> Self {
        let core = core_fraction.clamp(0.0, 1.0);
        let sigma = ((1.0 - core) / 3.0).max(f64::EPSILON);
        let (rx, ry) = (width as f64 / 2.0, height as f64 / 2.0);
        let cols = cols.start.min(width)..cols.end.min(width);
        let rows = rows.start.min(height)..rows.end.min(height);
        let (ww, wh) = (cols.len(), rows.len());

        let mut values = Vec::with_capacity(ww * wh);
        for y in rows {
            let ny = (y as f64 + 0.5 - ry) / ry;
            for x in cols.clone() {
                let nx = (x as f64 + 0.5 - rx) / rx;
                let r = (nx * nx + ny * ny).sqrt();
                let v = if r <= core {
                    1.0
                } else {
                    (-(r - core).powi(2) / (2.0 * sigma * sigma)).exp()
                };
                values.push(v as f32);
            }
        }
        Self {
            values,
            width: ww,
            height: wh,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }
}
