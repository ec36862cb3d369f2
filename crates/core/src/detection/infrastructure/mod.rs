pub mod alignment;
pub mod arcface_embedder;
pub mod face_analysis_model;
pub mod genderage_estimator;
pub mod insightface_locator;
pub mod math;
pub mod onnx_session;
pub mod scrfd_detector;
