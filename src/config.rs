use crate::Args;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub language: String,
    pub max_file_size: usize,
    pub tessdata_path: Option<String>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            database_url: args.database_url,
            language: args.language,
            max_file_size: args.max_file_size,
            tessdata_path: args.tessdata_path,
        }
    }
}
