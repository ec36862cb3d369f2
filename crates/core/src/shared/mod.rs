pub mod constants;
pub mod error;
pub mod image;
pub mod image_codec;
pub mod model_resolver;
pub mod region;
