use crate::backend::BackendError;
use crate::session::StorageError;
use shared::ErrorCode;
use shared::ticket::TableSession;
use thiserror::Error;

/// Errors surfaced by editing operations
///
/// Quantity arithmetic never fails (it clamps); only operations that depend on
/// external state or on an unresolved session gate produce one of these.
#[derive(Debug, Error)]
pub enum EditorError {
    /// The operation needs a selected line and none could be resolved
    #[error("Nothing to modify: no line selected")]
    NoSelection,

    /// batch-modify failed (validation or connectivity); pending changes are kept
    #[error("Backend rejected changes: {0}")]
    BackendRejected(String),

    #[error("Session expired for table {0}")]
    SessionExpired(String),

    #[error("Conflicting sessions on table {table_id} are unresolved")]
    ConflictUnresolved {
        table_id: String,
        conflicts: Vec<TableSession>,
    },

    #[error("Editing cancelled for table {0}")]
    EditCancelled(String),

    #[error("Local storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl EditorError {
    /// Stable code for the presentation layer (前端负责本地化)
    pub fn code(&self) -> ErrorCode {
        match self {
            EditorError::NoSelection => ErrorCode::NoSelection,
            EditorError::BackendRejected(_) => ErrorCode::BackendRejected,
            EditorError::SessionExpired(_) => ErrorCode::SessionExpired,
            EditorError::ConflictUnresolved { .. } => ErrorCode::ConflictUnresolved,
            EditorError::EditCancelled(_) => ErrorCode::EditCancelled,
            EditorError::Storage(_) => ErrorCode::StorageError,
            EditorError::Backend(e) => e.code(),
        }
    }

    /// Whether the user can simply retry the same operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EditorError::BackendRejected(_) | EditorError::Backend(_) | EditorError::Storage(_)
        )
    }
}

pub type EditorResult<T> = Result<T, EditorError>;
