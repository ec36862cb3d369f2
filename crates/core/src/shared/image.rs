use ndarray::ArrayView3;

use super::region::Region;

/// Number of interleaved channels every pipeline image carries (RGB).
pub const RGB_CHANNELS: u8 = 3;

/// An owned raster: contiguous RGB bytes in row-major order.
///
/// Stages never mutate an `Image` they were handed; every transformation
/// produces a new value so each stage stays independently testable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Image {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (RGB_CHANNELS as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels: RGB_CHANNELS,
        }
    }

    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 3);
        for _ in 0..(width as usize) * (height as usize) {
            data.extend_from_slice(&rgb);
        }
        Self::new(data, width, height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = ((y as usize) * (self.width as usize) + x as usize) * 3;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }

    /// Copies the pixels under `rect` into a new image.
    ///
    /// `rect` must already lie inside the image.
    pub fn crop(&self, rect: &Region) -> Image {
        let (x, y) = (rect.x as usize, rect.y as usize);
        let (w, h) = (rect.width as usize, rect.height as usize);
        debug_assert!(x + w <= self.width as usize && y + h <= self.height as usize);

        let stride = self.width as usize * 3;
        let mut out = Vec::with_capacity(w * h * 3);
        for row in y..y + h {
            let start = row * stride + x * 3;
            out.extend_from_slice(&self.data[start..start + w * 3]);
        }
        Image::new(out, w as u32, h as u32)
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Image data length must match dimensions")
    }

    /// Rec. 601 luma, one byte per pixel.
    pub fn to_luma(&self) -> Vec<u8> {
        self.data
            .chunks_exact(3)
            .map(|p| {
                let y = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
                y.round().clamp(0.0, 255.0) as u8
            })
            .collect()
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let image = Image::new(data.clone(), 2, 2);
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 2);
        assert_eq!(image.channels(), 3);
        assert_eq!(image.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Image::new(vec![0u8; 10], 2, 2);
    }

    #[test]
    fn test_filled_sets_every_pixel() {
        let image = Image::filled(3, 2, [10, 20, 30]);
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(image.pixel(x, y), [10, 20, 30]);
            }
        }
    }

    #[test]
    fn test_crop_copies_sub_rectangle() {
        // 4x3 image where each pixel's red channel encodes x + 10 * y
        let mut data = Vec::new();
        for y in 0..3u8 {
            for x in 0..4u8 {
                data.extend_from_slice(&[x + 10 * y, 0, 0]);
            }
        }
        let image = Image::new(data, 4, 3);
        let crop = image.crop(&Region::new(1, 1, 2, 2));
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.pixel(0, 0)[0], 11);
        assert_eq!(crop.pixel(1, 1)[0], 22);
    }

    #[test]
    fn test_crop_leaves_source_untouched() {
        let image = Image::filled(4, 4, [1, 2, 3]);
        let before = image.clone();
        let _ = image.crop(&Region::new(0, 0, 2, 2));
        assert_eq!(image, before);
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        let mut data = vec![0u8; 12];
        data[6] = 255; // row=1, col=0, R
        let image = Image::new(data, 2, 2);
        let arr = image.as_ndarray();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }

    #[test]
    fn test_to_luma_extremes() {
        let image = Image::new(vec![0, 0, 0, 255, 255, 255], 2, 1);
        assert_eq!(image.to_luma(), vec![0, 255]);
    }
}
