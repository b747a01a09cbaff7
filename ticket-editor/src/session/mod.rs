//! Session Conflict Resolver, autosave and recovery
//!
//! - **merge**: commutative sum of concurrent sessions on one table
//! - **resolver**: validate-before-edit, merge/overwrite/prompt, recover, cleanup
//! - **storage**: redb store for autosave records
//! - **autosave**: periodic worker persisting the pending ledger
//!
//! Nothing here is shared between terminals directly; other devices are only
//! seen through the backend `session-status` query.

pub mod autosave;
pub mod merge;
pub mod resolver;
pub mod storage;

// Re-exports
pub use autosave::{AutosaveHandle, AutosaveWorker, TickOutcome};
pub use merge::{merge_sessions, merged_lines};
pub use resolver::{
    ConflictChoice, ConflictPrompter, ConflictResolution, EditBlockReason, EditValidation,
    RecoveredSession, SessionConflictResolver,
};
pub use storage::{AutosaveStorage, StorageError, StorageResult};
