//! Order modification engine
//!
//! - **snapshot**: committed order lines of one table
//! - **ledger**: uncommitted quantity changes keyed by menu name
//! - **selection**: the single selected line and its presentation row
//! - **diff**: confirm-time `{additions, removals}` generation
//! - **coordinator**: public editing operations and confirm/cancel semantics
//!
//! # Data Flow
//!
//! ```text
//! UI event → ModificationCoordinator → {SelectionTracker, PendingChangeLedger}
//!                    ↓ confirm_all
//!              generate_diff → backend batch-modify
//!                    ↓ success
//!              SnapshotStore updated, ledger + selection cleared
//! ```

pub mod coordinator;
pub mod diff;
pub mod ledger;
pub mod selection;
pub mod snapshot;

// Re-exports
pub use coordinator::{AutoSelect, ConfirmOutcome, Confirmation, ModificationCoordinator};
pub use diff::{diff_changes, generate_diff};
pub use ledger::{PendingChangeLedger, QuantityUpdate};
pub use selection::{
    NoopHighlighter, RowHandle, RowHighlighter, RowResolver, Selection, SelectionTracker,
};
pub use snapshot::SnapshotStore;
