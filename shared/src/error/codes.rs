//! Unified error codes for the ticket editor
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Session errors
//! - 4xxx: Order modification errors
//! - 7xxx: Table errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility with the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,

    // ==================== 1xxx: Session ====================
    /// Not authenticated against the backend
    NotAuthenticated = 1001,
    /// Local editing session exceeded its maximum duration
    SessionExpired = 1005,

    // ==================== 4xxx: Order ====================
    /// Operation needs a selected line and none could be resolved
    NoSelection = 4101,
    /// Confirm called with an empty ledger
    NoChanges = 4102,
    /// Backend rejected the batch modification
    BackendRejected = 4103,

    // ==================== 7xxx: Table ====================
    /// Another session is editing the table and no resolution was supplied
    ConflictUnresolved = 7301,
    /// Conflict prompt was answered with cancel
    EditCancelled = 7302,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Local storage error
    StorageError = 9002,
    /// Network error
    NetworkError = 9003,
}

impl ErrorCode {
    /// Numeric value of the code
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Default English message (前端负责本地化)
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",

            ErrorCode::NotAuthenticated => "Not authenticated",
            ErrorCode::SessionExpired => "Session has expired",

            ErrorCode::NoSelection => "Nothing to modify",
            ErrorCode::NoChanges => "No pending changes",
            ErrorCode::BackendRejected => "Changes were rejected by the server",

            ErrorCode::ConflictUnresolved => "Another device is editing this table",
            ErrorCode::EditCancelled => "Editing was cancelled",

            ErrorCode::InternalError => "Internal error",
            ErrorCode::StorageError => "Local storage error",
            ErrorCode::NetworkError => "Network error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            1001 => Ok(ErrorCode::NotAuthenticated),
            1005 => Ok(ErrorCode::SessionExpired),
            4101 => Ok(ErrorCode::NoSelection),
            4102 => Ok(ErrorCode::NoChanges),
            4103 => Ok(ErrorCode::BackendRejected),
            7301 => Ok(ErrorCode::ConflictUnresolved),
            7302 => Ok(ErrorCode::EditCancelled),
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::StorageError),
            9003 => Ok(ErrorCode::NetworkError),
            _ => Err(InvalidErrorCode(value)),
        }
    }
}
