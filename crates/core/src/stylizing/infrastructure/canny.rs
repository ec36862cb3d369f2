//! Canny edge detection on a luma plane, with optional morphological closing.
//!
//! Produces the line-art layer of the cartoon render.

use std::collections::VecDeque;

use super::gaussian;

/// Pre-smoothing kernel (5 taps, sigma 1.4).
const BLUR_TAPS: usize = 5;
const BLUR_SIGMA: f64 = 1.4;

/// Binary edge map, row-major, one flag per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeMap {
    edges: Vec<bool>,
    width: usize,
    height: usize,
}

impl EdgeMap {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_edge(&self, x: usize, y: usize) -> bool {
        self.edges[y * self.width + x]
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.edges
    }

    pub fn count(&self) -> usize {
        self.edges.iter().filter(|&&e| e).count()
    }
}

/// Edge map of `luma` (`width * height` bytes).
///
/// Gradient magnitudes above `high` always survive; those between `low`
/// and `high` survive only when 8-connected to a strong edge.
pub fn detect(luma: &[u8], width: usize, height: usize, low: f32, high: f32) -> EdgeMap {
    let plane: Vec<f32> = luma.iter().map(|&v| v as f32).collect();
    let smoothed = gaussian::separable_blur(
        &plane,
        width,
        height,
        &gaussian::kernel_with_sigma(BLUR_TAPS, BLUR_SIGMA),
    );
    let (magnitude, gx, gy) = sobel(&smoothed, width, height);
    let thin = non_max_suppression(&magnitude, &gx, &gy, width, height);
    EdgeMap {
        edges: hysteresis(&thin, width, height, low, high),
        width,
        height,
    }
}

/// L1 gradient magnitude and components, borders replicated.
fn sobel(plane: &[f32], width: usize, height: usize) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let at = |x: isize, y: isize| {
        let cx = x.clamp(0, width as isize - 1) as usize;
        let cy = y.clamp(0, height as isize - 1) as usize;
        plane[cy * width + cx]
    };
    let n = width * height;
    let (mut mag, mut gxs, mut gys) = (vec![0.0; n], vec![0.0; n], vec![0.0; n]);
    for y in 0..height as isize {
        for x in 0..width as isize {
            let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
            let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
            let i = y as usize * width + x as usize;
            gxs[i] = gx;
            gys[i] = gy;
            mag[i] = gx.abs() + gy.abs();
        }
    }
    (mag, gxs, gys)
}

/// Keep only local maxima along the gradient direction. Border pixels are zeroed.
fn non_max_suppression(
    mag: &[f32],
    gx: &[f32],
    gy: &[f32],
    width: usize,
    height: usize,
) -> Vec<f32> {
    let mut out = vec![0.0f32; width * height];
    if width < 3 || height < 3 {
        return out;
    }
    // tan(22.5°) and tan(67.5°)
    const TAN_22: f32 = 0.414_213_57;
    const TAN_67: f32 = 2.414_213_6;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let i = y * width + x;
            let m = mag[i];
            if m == 0.0 {
                continue;
            }
            let (ax, ay) = (gx[i].abs(), gy[i].abs());
            let (a, b) = if ay <= ax * TAN_22 {
                // Horizontal gradient: compare left/right
                (mag[i - 1], mag[i + 1])
            } else if ay >= ax * TAN_67 {
                (mag[i - width], mag[i + width])
            } else if (gx[i] > 0.0) == (gy[i] > 0.0) {
                (mag[i - width - 1], mag[i + width + 1])
            } else {
                (mag[i - width + 1], mag[i + width - 1])
            };
            // Ties resolved toward the earlier neighbour so plateaus stay one pixel wide
            if m > a && m >= b {
                out[i] = m;
            }
        }
    }
    out
}

fn hysteresis(mag: &[f32], width: usize, height: usize, low: f32, high: f32) -> Vec<bool> {
    let mut edges = vec![false; width * height];
    let mut queue = VecDeque::new();
    for (i, &m) in mag.iter().enumerate() {
        if m > high {
            edges[i] = true;
            queue.push_back(i);
        }
    }

    while let Some(i) = queue.pop_front() {
        let (x, y) = ((i % width) as isize, (i / width) as isize);
        for dy in -1..=1isize {
            for dx in -1..=1isize {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                    continue;
                }
                let j = ny as usize * width + nx as usize;
                if !edges[j] && mag[j] > low {
                    edges[j] = true;
                    queue.push_back(j);
                }
            }
        }
    }
    edges
}

/// Morphological closing (dilate then erode) with a disc of `radius`.
/// Bridges small gaps in contour lines; `radius == 0` returns the map as is.
pub fn close(map: &EdgeMap, radius: u32) -> EdgeMap {
    if radius == 0 {
        return map.clone();
    }
    let element = disc(radius as isize);
    let dilated = morph(map, &element, true);
    morph(&dilated, &element, false)
}

fn disc(radius: isize) -> Vec<(isize, isize)> {
    let mut offsets = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

/// Dilation when `any`, erosion otherwise. Offsets outside the map are ignored.
fn morph(map: &EdgeMap, element: &[(isize, isize)], any: bool) -> EdgeMap {
    let (w, h) = (map.width as isize, map.height as isize);
    let mut edges = vec![false; map.edges.len()];
    for y in 0..h {
        for x in 0..w {
            let mut inside = element
                .iter()
                .map(|&(dx, dy)| (x + dx, y + dy))
                .filter(|&(nx, ny)| nx >= 0 && ny >= 0 && nx < w && ny < h)
                .map(|(nx, ny)| map.edges[(ny * w + nx) as usize]);
            edges[(y * w + x) as usize] = if any {
                inside.any(|e| e)
            } else {
                inside.all(|e| e)
            };
        }
    }
    EdgeMap {
        edges,
        width: map.width,
        height: map.height,
    }
}
