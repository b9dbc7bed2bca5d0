//! Error types and result aliases for the tabletalk library.
//!
//! This module defines the core error type [`TabletalkError`] and the [`Result`] type alias
//! used throughout the library. All public APIs that can fail return `Result<T>` for
//! consistent error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabletalkError {
    #[error("LLM gateway error: {0}")]
    GatewayError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TabletalkError>;
