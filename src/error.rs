use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to initialize OCR engine: {0}")]
    Initialization(String),

    #[error("No image attached to the request")]
    MissingFile,

    #[error("Only JPG/PNG files are allowed")]
    UnsupportedFormat,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Image too large (max: {max} bytes)")]
    ImageTooLarge { max: usize },

    #[error("Error recognizing text from image: {0}")]
    Recognition(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Initialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INIT_ERROR"),
            AppError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            AppError::UnsupportedFormat => (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            AppError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            AppError::Recognition(_) => (StatusCode::INTERNAL_SERVER_ERROR, "RECOGNITION_ERROR"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
