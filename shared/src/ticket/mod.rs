//! Ticket editing types
//!
//! Value types shared between the editing engine, the backend-of-record client
//! and the presentation layer:
//! - Lines: committed order lines, pending changes, derived display lines
//! - Sources: per-channel order records and their consolidated view
//! - Sessions: per-device editing sessions and local autosaves
//! - Api: batch-modify request/response payloads

pub mod api;
pub mod line;
pub mod session;
pub mod source;

// Re-exports
pub use api::{BatchModifyRequest, BatchModifyResponse};
pub use line::{ChangeType, CookingStatus, DisplayLine, EditModeState, OrderLine, PendingChange};
pub use session::{AutosaveRecord, SavedChange, SessionItem, SessionStatus, SessionType, TableSession};
pub use source::{ConsolidatedLine, OrderSource, SourceItem, SourceOrderRecord};
