use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} fetching {location}")]
    HttpStatus { status: u16, location: String },

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Destination schema mismatch: {0}")]
    Schema(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;
