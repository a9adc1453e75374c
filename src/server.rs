use crate::config::Config;
use crate::db::{self, AnalysisStore};
use crate::error::AppError;
use crate::ocr::tesseract::TesseractRecognizer;
use crate::ocr::Recognizer;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Content types the upload endpoint accepts
const ALLOWED_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// The chat client, served at /
const CHAT_PAGE: &str = include_str!("../static/index.html");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recognizer: Arc<dyn Recognizer>,
    pub store: AnalysisStore,
    pub config: Arc<Config>,
}

/// Upload response; the client reads `imageText`
#[derive(Serialize)]
pub struct UploadResponse {
    #[serde(rename = "imageText")]
    pub image_text: String,
    pub confidence: f32,
    pub processing_time_ms: u64,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub accepted_content_types: Vec<String>,
    pub language: String,
    pub max_file_size_bytes: usize,
}

/// Build the router over the given state
pub fn router(state: AppState) -> Router {
    // Leave headroom above the file limit for multipart framing so the
    // explicit size check on the decoded field is the one that fires.
    let body_limit = state.config.max_file_size + 64 * 1024;

    Router::new()
        .route("/", get(handle_index))
        .route("/upload", post(handle_upload))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let recognizer = TesseractRecognizer::new(&config)?;

    let pool = db::create_pool(&config.database_url).await?;
    db::migrate(&pool).await?;
    tracing::info!("Database ready at {}", config.database_url);

    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState {
        recognizer: Arc::new(recognizer),
        store: AnalysisStore::new(pool),
        config: Arc::new(config),
    };

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Serve the chat client
async fn handle_index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// A body larger than the request limit surfaces as a multipart read error;
/// that is an oversized upload, not a malformed form.
fn map_multipart_error(e: MultipartError, max_file_size: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!("Rejected upload exceeding the request body limit");
        return AppError::ImageTooLarge { max: max_file_size };
    }

    AppError::InvalidRequest(format!("Failed to parse multipart: {}", e))
}

/// Handle image uploads: validate, recognize, persist, respond
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let start = Instant::now();

    let mut file_data: Option<Bytes> = None;
    let mut content_type: Option<String> = None;

    let max_file_size = state.config.max_file_size;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| map_multipart_error(e, max_file_size))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "image" => {
                content_type = field.content_type().map(|s| s.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| map_multipart_error(e, max_file_size))?,
                );
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let data = match file_data {
        Some(data) => data,
        None => {
            tracing::warn!("Rejected upload with no image attached");
            return Err(AppError::MissingFile);
        }
    };

    let mime = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    if !ALLOWED_TYPES.contains(&mime.as_str()) {
        tracing::warn!("Rejected upload with content type: {}", mime);
        return Err(AppError::UnsupportedFormat);
    }

    if data.len() > max_file_size {
        tracing::warn!(
            "Rejected upload of {} bytes (max: {} bytes)",
            data.len(),
            max_file_size
        );
        return Err(AppError::ImageTooLarge { max: max_file_size });
    }

    let extension = match mime.as_str() {
        "image/png" => ".png",
        _ => ".jpg",
    };

    let mut temp_file = tempfile::Builder::new()
        .suffix(extension)
        .tempfile()
        .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))?;

    temp_file
        .write_all(&data)
        .map_err(|e| AppError::Internal(format!("Failed to write temp file: {}", e)))?;

    let result = state.recognizer.recognize(temp_file.path())?;

    // A row is written if and only if recognition succeeded
    let analysis = state.store.insert(&result.text).await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "Recognition completed in {}ms, confidence: {:.2}, text length: {}, id: {}",
        processing_time_ms,
        result.confidence,
        result.text.len(),
        analysis.id
    );

    Ok(Json(UploadResponse {
        image_text: result.text,
        confidence: result.confidence,
        processing_time_ms,
    }))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        accepted_content_types: ALLOWED_TYPES.iter().map(|s| s.to_string()).collect(),
        language: state.config.language.clone(),
        max_file_size_bytes: state.config.max_file_size,
    })
}
