//! Tesseract engine.
//!
//! Uses the tesseract-static crate for static linking (no system
//! dependencies). Downloads tessdata (training data) automatically on first
//! use unless TESSDATA_PREFIX points at an existing directory.

use crate::config::Config;
use crate::error::AppError;
use crate::ocr::{Recognition, Recognizer};
use std::io::Write;
use std::path::Path;
use tesseract_static::tesseract::Tesseract;

pub struct TesseractRecognizer {
    /// Path to tessdata directory
    tessdata_path: String,
    /// Recognition language (e.g. "eng")
    language: String,
}

impl TesseractRecognizer {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let language = config.language.clone();

        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(&language)?,
        };

        // Fail at startup rather than on the first upload
        Tesseract::new(Some(&tessdata_path), Some(&language)).map_err(|e| {
            AppError::Initialization(format!("Failed to initialize Tesseract: {}", e))
        })?;

        tracing::info!(
            "Tesseract engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            language
        );

        Ok(Self {
            tessdata_path,
            language,
        })
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, path: &Path) -> Result<Recognition, AppError> {
        let img = image::open(path)
            .map_err(|e| AppError::Recognition(format!("Failed to load image: {}", e)))?;

        // Convert to RGB8 and re-encode as BMP in memory; BMP is always
        // supported by leptonica regardless of how the upload was encoded.
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut bmp_data = Vec::new();
        {
            let mut cursor = std::io::Cursor::new(&mut bmp_data);
            rgb_img
                .write_to(&mut cursor, image::ImageFormat::Bmp)
                .map_err(|e| {
                    AppError::Recognition(format!("Failed to convert to BMP: {}", e))
                })?;
        }

        tracing::debug!(
            "Recognizing image: {}x{}, BMP size: {} bytes",
            width,
            height,
            bmp_data.len()
        );

        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(&self.language))
            .map_err(|e| AppError::Recognition(format!("Failed to create Tesseract: {}", e)))?;

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            AppError::Recognition(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                width,
                height,
                bmp_data.len(),
                e
            ))
        })?;

        tess = tess
            .recognize()
            .map_err(|e| AppError::Recognition(format!("Failed to recognize text: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| AppError::Recognition(format!("Failed to get text: {}", e)))?;

        // 0-100 scale, convert to 0.0-1.0
        let confidence = tess.mean_text_conf() as f32 / 100.0;

        Ok(Recognition {
            text: text.trim().to_string(),
            confidence,
        })
    }
}

// ============================================================================
// Tessdata download helpers
// ============================================================================

/// Ensure tessdata is available, downloading if needed
fn ensure_tessdata_available(language: &str) -> Result<String, AppError> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ocr-chat")
        .join("tessdata");

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        AppError::Initialization(format!("Failed to create tessdata directory: {}", e))
    })?;

    let traineddata_file = format!("{}.traineddata", language);
    let traineddata_path = cache_dir.join(&traineddata_file);

    if !traineddata_path.exists() {
        let url = tessdata_url(language);
        tracing::info!(
            "Downloading tessdata for '{}' (this may take a moment)...",
            language
        );
        download_file(&url, &traineddata_path)?;
        tracing::info!("Downloaded tessdata to {:?}", traineddata_path);
    } else {
        tracing::info!("Using cached tessdata from {:?}", cache_dir);
    }

    // Tesseract expects the directory, not the file
    cache_dir
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::Initialization("Invalid tessdata path".to_string()))
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

/// Download a file from URL to path using ureq
fn download_file(url: &str, path: &Path) -> Result<(), AppError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| AppError::Initialization(format!("Failed to download tessdata: {}", e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        AppError::Initialization(format!("Failed to read tessdata response: {}", e))
    })?;

    write_tessdata(path, &buffer)
}

/// Write the downloaded bytes to a temp file in the target directory and
/// rename into place. The final path only ever exists complete; an
/// interrupted write would otherwise pass the cache check on every later
/// startup and leave Tesseract unable to initialize.
fn write_tessdata(path: &Path, buffer: &[u8]) -> Result<(), AppError> {
    let dir = path
        .parent()
        .ok_or_else(|| AppError::Initialization("Invalid tessdata path".to_string()))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        AppError::Initialization(format!("Failed to create tessdata file: {}", e))
    })?;

    temp.write_all(buffer).map_err(|e| {
        AppError::Initialization(format!("Failed to write tessdata file: {}", e))
    })?;

    temp.persist(path).map_err(|e| {
        AppError::Initialization(format!("Failed to store tessdata file: {}", e))
    })?;

    Ok(())
}
