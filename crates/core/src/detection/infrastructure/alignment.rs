//! Similarity-transform face alignment for the recognition and attribute models.

use crate::shared::image::Image;

/// ArcFace reference landmark positions in a 112x112 crop.
pub const ARCFACE_TEMPLATE: [(f64, f64); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

pub const ARCFACE_SIZE: u32 = 112;

/// `x' = a*x - b*y + tx`, `y' = b*x + a*y + ty`: rotation, uniform scale and
/// translation without reflection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimilarityTransform {
    a: f64,
    b: f64,
    tx: f64,
    ty: f64,
}

impl SimilarityTransform {
    /// Uniform scale about `center`, which lands on `target`.
    pub fn scale_about(center: (f64, f64), scale: f64, target: (f64, f64)) -> Self {
        Self {
            a: scale,
            b: 0.0,
            tx: target.0 - scale * center.0,
            ty: target.1 - scale * center.1,
        }
    }

    /// Least-squares fit mapping `src` points onto `dst` points.
    ///
    /// Returns `None` when the source points coincide.
    pub fn estimate(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<Self> {
        debug_assert_eq!(src.len(), dst.len());
        let n = src.len() as f64;
        if n == 0.0 {
            return None;
        }
        let mean = |pts: &[(f64, f64)]| {
            let (sx, sy) = pts
                .iter()
                .fold((0.0, 0.0), |(ax, ay), (x, y)| (ax + x, ay + y));
            (sx / n, sy / n)
        };
        let (mx, my) = mean(src);
        let (mu, mv) = mean(dst);

        let mut dot = 0.0;
        let mut cross = 0.0;
        let mut norm = 0.0;
        for ((x, y), (u, v)) in src.iter().zip(dst) {
            let (xs, ys) = (x - mx, y - my);
            let (us, vs) = (u - mu, v - mv);
            dot += xs * us + ys * vs;
            cross += xs * vs - ys * us;
            norm += xs * xs + ys * ys;
        }
        if norm <= f64::EPSILON {
            return None;
        }

        let a = dot / norm;
        let b = cross / norm;
        Some(Self {
            a,
            b,
            tx: mu - (a * mx - b * my),
            ty: mv - (b * mx + a * my),
        })
    }

    pub fn apply(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.a + self.b * self.b;
        if det <= f64::EPSILON {
            return None;
        }
        let a = self.a / det;
        let b = -self.b / det;
        Some(Self {
            a,
            b,
            tx: -(a * self.tx - b * self.ty),
            ty: -(b * self.tx + a * self.ty),
        })
    }
}

/// Render `out_w` x `out_h` pixels of `image` seen through `transform`
/// (source to output). Samples falling outside the source are black.
pub fn warp(image: &Image, transform: &SimilarityTransform, out_w: u32, out_h: u32) -> Image {
    let mut out = vec![0u8; out_w as usize * out_h as usize * 3];
    let Some(inverse) = transform.inverse() else {
        return Image::new(out, out_w, out_h);
    };

    for y in 0..out_h as usize {
        for x in 0..out_w as usize {
            let (sx, sy) = inverse.apply((x as f64, y as f64));
            if let Some(rgb) = sample_bilinear(image, sx, sy) {
                let offset = (y * out_w as usize + x) * 3;
                out[offset..offset + 3].copy_from_slice(&rgb);
            }
        }
    }
    Image::new(out, out_w, out_h)
}

/// Crop aligned to the ArcFace template from five landmarks.
pub fn align_for_recognition(image: &Image, landmarks: &[(f64, f64); 5]) -> Option<Image> {
    let transform = SimilarityTransform::estimate(landmarks, &ARCFACE_TEMPLATE)?;
    Some(warp(image, &transform, ARCFACE_SIZE, ARCFACE_SIZE))
}

fn sample_bilinear(image: &Image, x: f64, y: f64) -> Option<[u8; 3]> {
    let w = image.width() as f64;
    let h = image.height() as f64;
    if x < -0.5 || y < -0.5 || x > w - 0.5 || y > h - 0.5 {
        return None;
    }
    let x = x.clamp(0.0, w - 1.0);
    let y = y.clamp(0.0, h - 1.0);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(image.width() - 1);
    let y1 = (y0 + 1).min(image.height() - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = image.pixel(x0, y0);
    let p10 = image.pixel(x1, y0);
    let p01 = image.pixel(x0, y1);
    let p11 = image.pixel(x1, y1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let v = p00[c] as f64 * (1.0 - fx) * (1.0 - fy)
            + p10[c] as f64 * fx * (1.0 - fy)
            + p01[c] as f64 * (1.0 - fx) * fy
            + p11[c] as f64 * fx * fy;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_estimate_recovers_known_transform() {
        let truth = SimilarityTransform {
            a: 0.8,
            b: 0.3,
            tx: 12.0,
            ty: -4.0,
        };
        let src = [(10.0, 10.0), (50.0, 12.0), (30.0, 35.0), (15.0, 60.0), (45.0, 58.0)];
        let dst: Vec<(f64, f64)> = src.iter().map(|&p| truth.apply(p)).collect();

        let fit = SimilarityTransform::estimate(&src, &dst).unwrap();
        assert_relative_eq!(fit.a, truth.a, epsilon = 1e-9);
        assert_relative_eq!(fit.b, truth.b, epsilon = 1e-9);
        assert_relative_eq!(fit.tx, truth.tx, epsilon = 1e-9);
        assert_relative_eq!(fit.ty, truth.ty, epsilon = 1e-9);
    }

    #[test]
    fn test_estimate_coincident_points() {
        let src = [(5.0, 5.0); 5];
        assert!(SimilarityTransform::estimate(&src, &ARCFACE_TEMPLATE).is_none());
    }

    #[test]
    fn test_inverse_round_trips_points() {
        let t = SimilarityTransform::scale_about((100.0, 80.0), 0.5, (48.0, 48.0));
        let inv = t.inverse().unwrap();
        let (x, y) = inv.apply(t.apply((130.0, 60.0)));
        assert_relative_eq!(x, 130.0, epsilon = 1e-9);
        assert_relative_eq!(y, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_scale_about_maps_center_to_target() {
        let t = SimilarityTransform::scale_about((100.0, 80.0), 0.5, (48.0, 48.0));
        assert_eq!(t.apply((100.0, 80.0)), (48.0, 48.0));
    }

    #[test]
    fn test_align_template_landmarks_is_identity_crop() {
        let image = Image::filled(112, 112, [90, 120, 150]);
        let aligned = align_for_recognition(&image, &ARCFACE_TEMPLATE).unwrap();
        assert_eq!(aligned.width(), ARCFACE_SIZE);
        assert_eq!(aligned.pixel(56, 56), [90, 120, 150]);
    }

    #[test]
    fn test_warp_outside_source_is_black() {
        let image = Image::filled(10, 10, [255, 255, 255]);
        // Shift the source far to the right of the output window
        let t = SimilarityTransform::scale_about((0.0, 0.0), 1.0, (100.0, 0.0));
        let out = warp(&image, &t, 20, 20);
        assert_eq!(out.pixel(5, 5), [0, 0, 0]);
    }
}
