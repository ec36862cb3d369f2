/// Precompute a normalised 1D Gaussian kernel of the given size.
///
/// `kernel_size` must be odd and >= 1. Sigma is derived as `kernel_size / 6.0`
/// (matching OpenCV's sigma=0 convention).
#[cfg(test)]
fn gaussian_kernel_1d(kernel_size: usize) -> Vec<f32> {
    debug_assert!(kernel_size >= 1 && kernel_size % 2 == 1);
    kernel_with_sigma(kernel_size, kernel_size as f64 / 6.0)
}

/// Normalised 1D Gaussian kernel with an explicit sigma.
pub fn kernel_with_sigma(kernel_size: usize, sigma: f64) -> Vec<f32> {
    let half = (kernel_size / 2) as f64;
    let mut kernel_f64: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel_f64.iter().sum();
    for v in &mut kernel_f64 {
        *v /= sum;
    }
    kernel_f64.iter().map(|&v| v as f32).collect()
}

/// Separable blur of a single-channel float plane with edge replication.
pub fn separable_blur(plane: &[f32], width: usize, height: usize, kernel: &[f32]) -> Vec<f32> {
    let kernel_size = kernel.len();
    if kernel_size <= 1 || width == 0 || height == 0 {
        return plane.to_vec();
    }
    let half = kernel_size / 2;
    let mut temp = vec![0.0f32; width * height];

    // Horizontal pass: plane → temp
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - half as isize)
                    .max(0)
                    .min((width - 1) as isize) as usize;
                sum += plane[y * width + sx] * w;
            }
            temp[y * width + x] = sum;
        }
    }

    // Vertical pass: temp → out
    let mut out = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - half as isize)
                    .max(0)
                    .min((height - 1) as isize) as usize;
                sum += temp[sy * width + x] * w;
            }
            out[y * width + x] = sum;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_sums_to_one() {
        let k = gaussian_kernel_1d(7);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_kernel_is_symmetric() {
        let k = kernel_with_sigma(5, 1.4);
        for i in 0..k.len() / 2 {
            assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_kernel_center_is_largest() {
        let k = gaussian_kernel_1d(7);
        let center = k[3];
        for (i, &v) in k.iter().enumerate() {
            if i != 3 {
                assert!(center >= v);
            }
        }
    }

    #[test]
    fn test_blur_uniform_plane_unchanged() {
        let plane = vec![128.0f32; 10 * 10];
        let out = separable_blur(&plane, 10, 10, &gaussian_kernel_1d(5));
        assert!(out.iter().all(|&v| (v - 128.0).abs() < 1e-3));
    }

    #[test]
    fn test_blur_spreads_single_peak() {
        let mut plane = vec![0.0f32; 10 * 10];
        plane[5 * 10 + 5] = 255.0;
        let out = separable_blur(&plane, 10, 10, &gaussian_kernel_1d(5));
        assert!(out[5 * 10 + 5] < 255.0);
        assert!(out[5 * 10 + 6] > 0.0);
    }

    #[test]
    fn test_kernel_size_1_is_identity() {
        let plane: Vec<f32> = (0..25).map(|v| v as f32).collect();
        assert_eq!(separable_blur(&plane, 5, 5, &gaussian_kernel_1d(1)), plane);
    }
}
