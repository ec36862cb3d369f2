pub const DETECTOR_MODEL_NAME: &str = "det_10g.onnx";
pub const DETECTOR_MODEL_URL: &str =
    "https://huggingface.co/public-data/insightface/resolve/main/models/buffalo_l/det_10g.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://huggingface.co/public-data/insightface/resolve/main/models/buffalo_l/w600k_r50.onnx";

pub const GENDERAGE_MODEL_NAME: &str = "genderage.onnx";
pub const GENDERAGE_MODEL_URL: &str =
    "https://huggingface.co/public-data/insightface/resolve/main/models/buffalo_l/genderage.onnx";

/// Number of facial landmarks every detection carries.
pub const LANDMARK_COUNT: usize = 5;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
