//! Shared types for the ticket editor
//!
//! Value types used across the editing engine, the backend client and the
//! presentation layer: order lines, pending changes, source orders, editing
//! sessions, error codes and the API response envelope.

pub mod error;
pub mod response;
pub mod ticket;

// Re-exports
pub use error::ErrorCode;
pub use response::ApiResponse;
pub use serde::{Deserialize, Serialize};
