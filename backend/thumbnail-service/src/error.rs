/// Error types for Thumbnail Service
///
/// Pipeline stages catch these at their boundary and only log them. The HTTP
/// surface converts them into plain-text responses (the gallery endpoint is the
/// only handler that can actually fail).
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

/// Result type for thumbnail-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Object store or broker call failed on the wire
    #[error("Transport error: {0}")]
    Transport(String),

    /// Object does not exist in the requested bucket
    #[error("Not found: {0}")]
    NotFound(String),

    /// Image payload is corrupt or in an unsupported format
    #[error("Decode error: {0}")]
    Decode(String),

    /// Broker envelope or inner event could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Startup configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Parse(_) => StatusCode::BAD_REQUEST,
            AppError::Transport(_)
            | AppError::Decode(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
