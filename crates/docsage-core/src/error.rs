//! Error types for DocSage.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The payload could not be turned into text.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Missing credential or an unusable configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The generation backend failed (transport, auth, rate limit, bad response).
    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
