//! Backend client error types

use shared::ErrorCode;
use thiserror::Error;

/// Backend-of-record error type
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connectivity, timeout, body decoding)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request failed backend validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backend internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackendError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BackendError::Http(_) => ErrorCode::NetworkError,
            BackendError::Unauthorized => ErrorCode::NotAuthenticated,
            BackendError::NotFound(_) => ErrorCode::NotFound,
            BackendError::Validation(_) => ErrorCode::ValidationFailed,
            BackendError::InvalidResponse(_)
            | BackendError::Internal(_)
            | BackendError::Serialization(_) => ErrorCode::InternalError,
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
