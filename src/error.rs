//! Application error types

use serde::Serialize;
use thiserror::Error;

/// Why a single feed line could not be turned into a quote
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteParseError {
    #[error("invalid line format: {0}")]
    InvalidFormat(String),

    #[error("empty payload for {0}")]
    EmptyPayload(String),

    #[error("unknown market for {0}")]
    UnknownMarket(String),

    #[error("{code}: expected at least {expected} fields, got {actual}")]
    InsufficientFields {
        code: String,
        expected: usize,
        actual: usize,
    },
}

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Quote parse error: {0}")]
    QuoteParse(#[from] QuoteParseError),

    #[error("Quote feed error: {0}")]
    Feed(String),

    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code for the UI
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Http(_) => "HTTP_ERROR",
            AppError::QuoteParse(_) => "QUOTE_PARSE_ERROR",
            AppError::Feed(_) => "FEED_ERROR",
            AppError::Duplicate(_) => "DUPLICATE",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Notification(_) => "NOTIFICATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Serializable error response for frontend
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        ErrorResponse {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        ErrorResponse {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        ErrorResponse::from(self).serialize(serializer)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_codes() {
        let resp = ErrorResponse::from(AppError::Duplicate("sh600000".into()));
        assert_eq!(resp.code, "DUPLICATE");
        assert!(resp.message.contains("sh600000"));

        let parse: AppError = QuoteParseError::UnknownMarket("xx1".into()).into();
        assert_eq!(parse.code(), "QUOTE_PARSE_ERROR");
    }
}
