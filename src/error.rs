//! Application error types

use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("No data returned: {0}")]
    NoData(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error category exposed to consumers that render error states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Network,
    InvalidQuery,
    NoData,
    Storage,
    Validation,
    NotFound,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::InvalidQuery => "INVALID_QUERY",
            ErrorKind::NoData => "NO_DATA",
            ErrorKind::Storage => "STORAGE_ERROR",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Config => "CONFIG_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl AppError {
    /// Map the error onto the network / invalid-query / no-data taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Http(_) | AppError::Network(_) | AppError::Serialization(_) => {
                ErrorKind::Network
            }
            AppError::InvalidQuery(_) => ErrorKind::InvalidQuery,
            AppError::NoData(_) => ErrorKind::NoData,
            AppError::Database(_) | AppError::Io(_) => ErrorKind::Storage,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Config(_) => ErrorKind::Config,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Serializable error response for consumers
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        ErrorResponse {
            code: err.kind().code().to_string(),
            message: err.to_string(),
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        ErrorResponse {
            code: self.kind().code().to_string(),
            message: self.to_string(),
        }
        .serialize(serializer)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
