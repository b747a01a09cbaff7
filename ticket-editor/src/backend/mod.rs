//! Backend-of-record interface
//!
//! The engine reaches the single backend-of-record only through
//! [`BackendOfRecord`]. [`HttpBackend`] is the reqwest implementation; tests
//! plug in in-memory doubles.
//!
//! | Operation | HTTP |
//! |-----------|------|
//! | `session_status` | `GET api/tables/{id}/session-status` |
//! | `batch_modify` | `POST api/tables/{id}/batch-modify` |
//! | `active_orders` | `GET api/tables/{id}/active-orders` |

mod error;
pub mod http;

pub use error::{BackendError, BackendResult};
pub use http::HttpBackend;

use async_trait::async_trait;
use shared::ticket::{BatchModifyRequest, BatchModifyResponse, SessionStatus, SourceOrderRecord};

/// Transport-agnostic access to the backend-of-record
#[async_trait]
pub trait BackendOfRecord: Send + Sync {
    /// Who else is editing the table right now
    async fn session_status(&self, table_id: &str) -> BackendResult<SessionStatus>;

    /// Submit one diff as an atomic batch (accepted or rejected as a unit)
    async fn batch_modify(
        &self,
        table_id: &str,
        request: &BatchModifyRequest,
    ) -> BackendResult<BatchModifyResponse>;

    /// All active source orders of the table
    async fn active_orders(&self, table_id: &str) -> BackendResult<Vec<SourceOrderRecord>>;
}
