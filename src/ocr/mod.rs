//! Text recognition.
//!
//! The upload handler talks to the engine through the `Recognizer` trait so
//! it can be tested without running Tesseract.

pub mod tesseract;

use crate::error::AppError;
use std::path::Path;

/// Result of one recognition pass
#[derive(Debug, Clone)]
pub struct Recognition {
    /// Extracted text, trimmed
    pub text: String,
    /// Mean word confidence, 0.0-1.0
    pub confidence: f32,
}

/// Interface between the upload handler and the OCR engine
pub trait Recognizer: Send + Sync {
    /// Run recognition on an image file and return the extracted text
    fn recognize(&self, path: &Path) -> Result<Recognition, AppError>;
}
