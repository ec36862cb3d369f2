//! Separable resize: area averaging along a shrinking axis, bilinear along
//! an enlarging one.

use std::ops::Range;

use crate::shared::image::Image;

/// Source taps for one output sample: `(source index, weight)`.
type Taps = Vec<(usize, f32)>;

/// Resize `image` to exactly `width` x `height`. Zero target dimensions
/// yield an empty image.
pub fn resize(image: &Image, width: u32, height: u32) -> Image {
    if (image.width(), image.height()) == (width, height) {
        return image.clone();
    }
    resize_window(image, width, height, 0..width as usize, 0..height as usize)
}

/// The `cols` x `rows` window of `image` resized to `width` x `height`,
/// without materialising the rest of the resized image. Ranges are clipped
/// to the resized extent.
pub fn resize_window(
    image: &Image,
    width: u32,
    height: u32,
    cols: Range<usize>,
    rows: Range<usize>,
) -> Image {
    let (sw, sh) = (image.width() as usize, image.height() as usize);
    let (tw, th) = (width as usize, height as usize);
    let cols = cols.start.min(tw)..cols.end.min(tw);
    let rows = rows.start.min(th)..rows.end.min(th);
    let (ww, wh) = (cols.len(), rows.len());
    if ww == 0 || wh == 0 || sw == 0 || sh == 0 {
        return Image::new(Vec::new(), 0, 0);
    }

    let src: Vec<f32> = image.data().iter().map(|&v| v as f32).collect();
    let x_taps = axis_taps(sw, tw, cols);
    let y_taps = axis_taps(sh, th, rows);

    // Horizontal pass: sw x sh → ww x sh
    let mut temp = vec![0.0f32; ww * sh * 3];
    for y in 0..sh {
        for (x, taps) in x_taps.iter().enumerate() {
            for c in 0..3 {
                temp[(y * ww + x) * 3 + c] = taps
                    .iter()
                    .map(|&(i, w)| src[(y * sw + i) * 3 + c] * w)
                    .sum();
            }
        }
    }

    // Vertical pass: ww x sh → ww x wh
    let mut out = vec![0u8; ww * wh * 3];
    for (y, taps) in y_taps.iter().enumerate() {
        for x in 0..ww {
            for c in 0..3 {
                let v: f32 = taps
                    .iter()
                    .map(|&(i, w)| temp[(i * ww + x) * 3 + c] * w)
                    .sum();
                out[(y * ww + x) * 3 + c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    Image::new(out, ww as u32, wh as u32)
}

/// Taps for the output samples in `range` of a `dst_len` axis.
fn axis_taps(src_len: usize, dst_len: usize, range: Range<usize>) -> Vec<Taps> {
    if dst_len < src_len {
        area_taps(src_len, dst_len, range)
    } else {
        bilinear_taps(src_len, dst_len, range)
    }
}

/// Each output sample averages the source interval it covers, with partial
/// coverage at both ends.
fn area_taps(src_len: usize, dst_len: usize, range: Range<usize>) -> Vec<Taps> {
    let scale = src_len as f64 / dst_len as f64;
    range
        .map(|j| {
            let start = j as f64 * scale;
            let end = start + scale;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            (first..last)
                .filter_map(|i| {
                    let overlap = (end.min(i as f64 + 1.0) - start.max(i as f64)).max(0.0);
                    (overlap > 0.0).then_some((i, (overlap / scale) as f32))
                })
                .collect()
        })
        .collect()
}

/// Pixel-centre aligned linear interpolation, edges replicated.
fn bilinear_taps(src_len: usize, dst_len: usize, range: Range<usize>) -> Vec<Taps> {
    let scale = src_len as f64 / dst_len as f64;
    range
        .map(|j| {
            let pos = ((j as f64 + 0.5) * scale - 0.5).clamp(0.0, (src_len - 1) as f64);
            let i0 = pos.floor() as usize;
            let i1 = (i0 + 1).min(src_len - 1);
            let f = (pos - i0 as f64) as f32;
            if f == 0.0 || i0 == i1 {
                vec![(i0, 1.0)]
            } else {
                vec![(i0, 1.0 - f), (i1, f)]
            }
        })
        .collect()
}
