//! Edge-preserving smoothing: a bilateral filter over a circular window.

use crate::shared::image::Image;

/// Each output pixel is a weighted mean of its neighbours within `radius`.
/// Weights fall off with distance (`sigma_space`) and with the L1 colour
/// difference from the centre pixel (`sigma_color`), so flat areas blur
/// while hard boundaries survive.
pub fn bilateral_filter(image: &Image, radius: u32, sigma_color: f64, sigma_space: f64) -> Image {
    let (w, h) = (image.width() as isize, image.height() as isize);
    if radius == 0 || image.is_empty() {
        return image.clone();
    }
    let r = radius as isize;
    let src = image.data();

    // Spatial weights for the circular window
    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let window: Vec<(isize, isize, f64)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx * dx + dy * dy <= r * r)
        .map(|(dx, dy)| (dx, dy, (((dx * dx + dy * dy) as f64) * space_coeff).exp()))
        .collect();

    // Colour weights indexed by L1 distance (0..=765)
    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let color_lut: Vec<f64> = (0..=255 * 3)
        .map(|d| ((d * d) as f64 * color_coeff).exp())
        .collect();

    let mut out = vec![0u8; src.len()];
    for y in 0..h {
        for x in 0..w {
            let ci = ((y * w + x) * 3) as usize;
            let center = &src[ci..ci + 3];
            let mut acc = [0.0f64; 3];
            let mut weight_sum = 0.0f64;
            for &(dx, dy, ws) in &window {
                let sx = (x + dx).clamp(0, w - 1);
                let sy = (y + dy).clamp(0, h - 1);
                let ni = ((sy * w + sx) * 3) as usize;
                let p = &src[ni..ni + 3];
                let diff = (0..3)
                    .map(|c| (p[c] as i32 - center[c] as i32).unsigned_abs() as usize)
                    .sum::<usize>();
                let wt = ws * color_lut[diff];
                for c in 0..3 {
                    acc[c] += p[c] as f64 * wt;
                }
                weight_sum += wt;
            }
            for c in 0..3 {
                out[ci + c] = (acc[c] / weight_sum).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    Image::new(out, image.width(), image.height())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_image(w: u32, h: u32, left: [u8; 3], right: [u8; 3]) -> Image {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for _ in 0..h {
            for x in 0..w {
                data.extend_from_slice(if x < w / 2 { &left } else { &right });
            }
        }
        Image::new(data, w, h)
    }

    #[test]
    fn test_uniform_image_unchanged() {
        let image = Image::filled(12, 12, [40, 90, 200]);
        assert_eq!(bilateral_filter(&image, 4, 75.0, 75.0), image);
    }

    #[test]
    fn test_hard_boundary_preserved() {
        let image = split_image(16, 8, [0, 0, 0], [255, 255, 255]);
        let out = bilateral_filter(&image, 4, 30.0, 75.0);
        // A 765 L1 jump is far outside the colour tolerance
        assert_eq!(out.pixel(7, 4), [0, 0, 0]);
        assert_eq!(out.pixel(8, 4), [255, 255, 255]);
    }

    #[test]
    fn test_small_noise_is_smoothed() {
        let mut data = Image::filled(9, 9, [100, 100, 100]).into_data();
        let centre = (4 * 9 + 4) * 3;
        data[centre..centre + 3].copy_from_slice(&[120, 120, 120]);
        let out = bilateral_filter(&Image::new(data, 9, 9), 4, 75.0, 75.0);
        let v = out.pixel(4, 4)[0];
        assert!(v > 100 && v < 110, "centre = {v}");
    }

    #[test]
    fn test_radius_zero_is_identity() {
        let image = split_image(6, 6, [10, 20, 30], [200, 100, 50]);
        assert_eq!(bilateral_filter(&image, 0, 75.0, 75.0), image);
    }
}
