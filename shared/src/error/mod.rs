//! Unified error codes
//!
//! - [`ErrorCode`]: Standardized error codes surfaced to the presentation layer
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Session errors
//! - 4xxx: Order modification errors
//! - 7xxx: Table errors
//! - 9xxx: System errors

mod codes;

pub use codes::{ErrorCode, InvalidErrorCode};
