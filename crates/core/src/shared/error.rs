//! Stage errors and the flat terminal failure taxonomy.

use serde::Serialize;
use thiserror::Error;

use super::region::Region;

/// FaceLocator could not run on the given image.
///
/// Finding zero faces is *not* a failure; see `DetectionSet::is_empty`.
#[derive(Error, Debug)]
pub enum DetectionFailure {
    #[error("image is malformed: {0}")]
    MalformedImage(String),
    #[error("face model inference failed: {0}")]
    Inference(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StylizationFailure {
    #[error("face region {region:?} is empty after padding and clamping to {image_width}x{image_height}")]
    DegenerateRegion {
        region: Region,
        image_width: u32,
        image_height: u32,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CompositeFailure {
    #[error("target region {0:?} has no area")]
    DegenerateTarget(Region),
    #[error("target region {region:?} does not overlap the {width}x{height} destination")]
    OutsideDestination {
        region: Region,
        width: u32,
        height: u32,
    },
}

/// Why a pipeline run ended in `Failed`. One variant per user-facing message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FailureReason {
    InvalidImage,
    NoFaceDetected,
    StylizationError,
    TemplateTooSmall,
    ModelError,
    EncodingError,
}

impl FailureReason {
    /// Actionable text a caller can show verbatim.
    pub fn user_message(self) -> &'static str {
        match self {
            FailureReason::InvalidImage => {
                "The uploaded file could not be read as an image. Please upload a JPEG or PNG."
            }
            FailureReason::NoFaceDetected => {
                "No face was found. Please use a clearer, well-lit, front-facing photo."
            }
            FailureReason::StylizationError => {
                "The detected face could not be processed. Please try a different photo."
            }
            FailureReason::TemplateTooSmall => {
                "The illustration template is too small for the face area. Please choose a larger template."
            }
            FailureReason::ModelError => "Face analysis failed unexpectedly. Please try again.",
            FailureReason::EncodingError => "The result image could not be produced.",
        }
    }
}

/// Terminal failure of a personalization request. Never retried internally.
#[derive(Error, Debug)]
pub enum PipelineFailure {
    #[error("invalid {input} image: {detail}")]
    InvalidImage { input: &'static str, detail: String },
    #[error("no face detected in the source photo")]
    NoFaceDetected,
    #[error("stylization failed: {0}")]
    StylizationError(#[from] StylizationFailure),
    #[error("template too small: {0}")]
    TemplateTooSmall(String),
    #[error("face model error: {0}")]
    ModelError(String),
    #[error("failed to encode result: {0}")]
    EncodingError(String),
}

impl PipelineFailure {
    pub fn reason(&self) -> FailureReason {
        match self {
            PipelineFailure::InvalidImage { .. } => FailureReason::InvalidImage,
            PipelineFailure::NoFaceDetected => FailureReason::NoFaceDetected,
            PipelineFailure::StylizationError(_) => FailureReason::StylizationError,
            PipelineFailure::TemplateTooSmall(_) => FailureReason::TemplateTooSmall,
            PipelineFailure::ModelError(_) => FailureReason::ModelError,
            PipelineFailure::EncodingError(_) => FailureReason::EncodingError,
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.reason().user_message()
    }
}

impl From<DetectionFailure> for PipelineFailure {
    fn from(err: DetectionFailure) -> Self {
        match err {
            DetectionFailure::MalformedImage(detail) => PipelineFailure::InvalidImage {
                input: "source",
                detail,
            },
            DetectionFailure::Inference(detail) => PipelineFailure::ModelError(detail),
        }
    }
}

impl From<CompositeFailure> for PipelineFailure {
    fn from(err: CompositeFailure) -> Self {
        PipelineFailure::TemplateTooSmall(err.to_string())
    }
}
