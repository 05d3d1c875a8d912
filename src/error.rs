use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures of a single `/predict` call. Client-caused variants map to 4xx,
/// everything that went wrong after a valid image was decoded maps to 5xx.
///
/// Every multipart failure, including a body over the configured limit, is
/// an `Upload` and answers 400 with the multipart error text.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("Invalid multipart upload: {0}")]
    Upload(String),

    #[error("Cannot decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Inference failed: {0}")]
    Inference(String),
}

impl PredictError {
    pub fn status(&self) -> StatusCode {
        match self {
            PredictError::MissingFile | PredictError::Upload(_) | PredictError::Decode(_) => {
                StatusCode::BAD_REQUEST
            }
            PredictError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tensorflow::Status> for PredictError {
    fn from(status: tensorflow::Status) -> Self {
        PredictError::Inference(status.to_string())
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Startup failures while loading the weights artifact. None of these are
/// recoverable; the process does not serve without a loaded model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Weights file not found: {0}")]
    NotFound(String),

    #[error("Failed to read weights file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TensorFlow error: {0}")]
    Tensorflow(#[from] tensorflow::Status),

    #[error("Operation '{0}' not found in graph")]
    MissingOperation(String),

    #[error("Warm-up forward pass failed: {0}")]
    WarmUp(#[source] PredictError),

    #[error("Model produced {got} scores, expected {expected}")]
    OutputShape { expected: usize, got: usize },
}
