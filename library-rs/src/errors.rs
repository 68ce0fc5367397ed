//! Error types for the Sunshine-AIO library core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AioError {
    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Checksum mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Sync error: {0}")]
    SyncError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Regex error: {0}")]
    RegexError(String),
}

impl From<regex::Error> for AioError {
    fn from(err: regex::Error) -> Self {
        AioError::RegexError(err.to_string())
    }
}

impl From<reqwest::Error> for AioError {
    fn from(err: reqwest::Error) -> Self {
        AioError::NetworkError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AioError>;
