//! Byte-level boundary of the pipeline: raster decoding and PNG encoding.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;

use super::image::Image;

#[derive(Error, Debug)]
pub enum ImageCodecError {
    #[error("could not decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("decoded image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("could not encode PNG: {0}")]
    Encode(#[source] image::ImageError),
}

/// Decodes JPEG/PNG (or any format the `image` crate recognises) into RGB.
pub fn decode(bytes: &[u8]) -> Result<Image, ImageCodecError> {
    let rgb = image::load_from_memory(bytes)
        .map_err(ImageCodecError::Decode)?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageCodecError::Empty { width, height });
    }
    Ok(Image::new(rgb.into_raw(), width, height))
}

pub fn encode_png(image: &Image) -> Result<Vec<u8>, ImageCodecError> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(
            image.data(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(ImageCodecError::Encode)?;
    Ok(out)
}
