use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod ocr;
mod server;

#[derive(Parser, Debug)]
#[command(name = "ocr-chat-server")]
#[command(about = "Chat-style web client with an OCR upload endpoint")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "OCR_CHAT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "OCR_CHAT_PORT", default_value = "5000")]
    pub port: u16,

    /// SQLite database URL for recognized-text records
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./analyses.db")]
    pub database_url: String,

    /// Language for OCR (e.g., "eng", "deu", "fra")
    #[arg(long, env = "OCR_CHAT_LANGUAGE", default_value = "eng")]
    pub language: String,

    /// Maximum upload size in bytes (default: 50MB)
    #[arg(long, env = "OCR_CHAT_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from(args);

    tracing::info!("Starting ocr-chat-server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Binding to {}:{}", config.host, config.port);

    server::run(config).await
}
