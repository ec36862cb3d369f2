//! Colour quantization by k-means (Lloyd's algorithm) with deterministic seeding.
//!
//! Seeds are the pixels at evenly spaced luma quantiles, so identical input
//! always yields identical palettes.

use crate::shared::image::Image;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KMeansParams {
    pub clusters: usize,
    pub max_iterations: u32,
    /// Stop once no centre moves farther than this (RGB units).
    pub epsilon: f64,
}

/// Replace every pixel with the colour of its cluster centre.
///
/// The output never holds more than `params.clusters` distinct colours.
pub fn quantize(image: &Image, params: &KMeansParams) -> Image {
    let pixels: Vec<[f64; 3]> = image
        .data()
        .chunks_exact(3)
        .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64])
        .collect();
    if pixels.is_empty() || params.clusters == 0 {
        return image.clone();
    }

    let mut centers = seed_centers(image, &pixels, params.clusters);
    let mut labels = vec![0usize; pixels.len()];

    for iteration in 0..params.max_iterations.max(1) {
        assign(&pixels, &centers, &mut labels);
        let updated = recompute(&pixels, &labels, &centers);
        let shift = centers
            .iter()
            .zip(&updated)
            .map(|(a, b)| distance_sq(a, b).sqrt())
            .fold(0.0, f64::max);
        centers = updated;
        if shift <= params.epsilon {
            log::trace!("k-means converged after {} iterations", iteration + 1);
            break;
        }
    }
    assign(&pixels, &centers, &mut labels);

    let palette: Vec<[u8; 3]> = centers
        .iter()
        .map(|c| c.map(|v| v.round().clamp(0.0, 255.0) as u8))
        .collect();
    let mut out = Vec::with_capacity(image.data().len());
    for &label in &labels {
        out.extend_from_slice(&palette[label]);
    }
    Image::new(out, image.width(), image.height())
}

/// Pixels at positions `(i + 0.5) * n / k` in a stable luma ordering.
fn seed_centers(image: &Image, pixels: &[[f64; 3]], k: usize) -> Vec<[f64; 3]> {
    let luma = image.to_luma();
    let mut order: Vec<usize> = (0..pixels.len()).collect();
    order.sort_by_key(|&i| luma[i]);
    let n = pixels.len();
    (0..k)
        .map(|i| {
            let pos = (((i as f64 + 0.5) * n as f64 / k as f64) as usize).min(n - 1);
            pixels[order[pos]]
        })
        .collect()
}

/// Nearest centre per pixel; ties go to the lower index.
fn assign(pixels: &[[f64; 3]], centers: &[[f64; 3]], labels: &mut [usize]) {
    for (p, label) in pixels.iter().zip(labels.iter_mut()) {
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (j, c) in centers.iter().enumerate() {
            let d = distance_sq(p, c);
            if d < best_d {
                best_d = d;
                best = j;
            }
        }
        *label = best;
    }
}

/// Mean of each cluster; an empty cluster keeps its previous centre.
fn recompute(pixels: &[[f64; 3]], labels: &[usize], previous: &[[f64; 3]]) -> Vec<[f64; 3]> {
    let mut sums = vec![[0.0f64; 3]; previous.len()];
    let mut counts = vec![0usize; previous.len()];
    for (p, &label) in pixels.iter().zip(labels) {
        for c in 0..3 {
            sums[label][c] += p[c];
        }
        counts[label] += 1;
    }
    sums.iter()
        .zip(&counts)
        .zip(previous)
        .map(|((sum, &count), prev)| {
            if count == 0 {
                *prev
            } else {
                sum.map(|s| s / count as f64)
            }
        })
        .collect()
}

fn distance_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|c| (a[c] - b[c]) * (a[c] - b[c])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use rstest::rstest;

    const PARAMS: KMeansParams = KMeansParams {
        clusters: 8,
        max_iterations: 10,
        epsilon: 1.0,
    };

    /// Smooth colour ramp with many distinct colours.
    fn gradient(w: u32, h: u32) -> Image {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[
                    (x * 255 / w.max(1)) as u8,
                    (y * 255 / h.max(1)) as u8,
                    ((x + y) * 127 / (w + h).max(1)) as u8,
                ]);
            }
        }
        Image::new(data, w, h)
    }

    fn distinct_colors(image: &Image) -> usize {
        image
            .data()
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect::<HashSet<_>>()
            .len()
    }

    #[rstest]
    #[case(2)]
    #[case(4)]
    #[case(8)]
    fn test_distinct_colors_bounded_by_cluster_count(#[case] clusters: usize) {
        let params = KMeansParams { clusters, ..PARAMS };
        let out = quantize(&gradient(40, 30), &params);
        assert!(distinct_colors(&out) <= clusters);
    }

    #[test]
    fn test_quantize_is_deterministic() {
        let image = gradient(37, 23);
        assert_eq!(quantize(&image, &PARAMS), quantize(&image, &PARAMS));
    }

    #[test]
    fn test_two_colour_image_keeps_both_colours() {
        let mut data = Image::filled(10, 10, [200, 30, 30]).into_data();
        for px in data.chunks_exact_mut(3).take(50) {
            px.copy_from_slice(&[10, 10, 240]);
        }
        let image = Image::new(data, 10, 10);
        let out = quantize(&image, &KMeansParams { clusters: 2, ..PARAMS });
        assert_eq!(out, image);
    }

    #[test]
    fn test_fewer_pixels_than_clusters() {
        let image = gradient(2, 1);
        let out = quantize(&image, &PARAMS);
        assert_eq!(out, image);
    }

    #[test]
    fn test_output_keeps_dimensions() {
        let out = quantize(&gradient(13, 7), &PARAMS);
        assert_eq!((out.width(), out.height()), (13, 7));
    }
}
