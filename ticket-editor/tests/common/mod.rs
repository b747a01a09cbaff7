//! Shared helpers for TableEditor integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use shared::ticket::{
    BatchModifyRequest, BatchModifyResponse, OrderSource, SessionItem, SessionStatus,
    SessionType, SourceItem, SourceOrderRecord, TableSession,
};
use std::sync::Arc;
use tempfile::TempDir;
use ticket_editor::orders::{RowHandle, RowHighlighter, RowResolver};
use ticket_editor::session::AutosaveStorage;
use ticket_editor::{BackendError, BackendOfRecord, BackendResult, ConflictPolicy, EditorConfig, TableEditor};
use tokio::sync::Notify;

#[derive(Default)]
struct MockState {
    orders: Vec<SourceOrderRecord>,
    status: SessionStatus,
    fail_batch: bool,
    reject_batch: Option<String>,
    hold_batch: bool,
    requests: Vec<BatchModifyRequest>,
}

/// In-memory backend-of-record
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
    /// Signalled when a held batch-modify has been received
    pub entered: Notify,
    /// Releases a held batch-modify
    pub release: Notify,
}

impl MockBackend {
    pub fn with_orders(orders: Vec<SourceOrderRecord>) -> Arc<Self> {
        let backend = Self::default();
        backend.state.lock().orders = orders;
        Arc::new(backend)
    }

    /// Another terminal changed the table's active orders
    pub fn set_orders(&self, orders: Vec<SourceOrderRecord>) {
        self.state.lock().orders = orders;
    }

    pub fn set_status(&self, status: SessionStatus) {
        self.state.lock().status = status;
    }

    pub fn set_fail_batch(&self, fail: bool) {
        self.state.lock().fail_batch = fail;
    }

    pub fn set_reject_batch(&self, reason: Option<&str>) {
        self.state.lock().reject_batch = reason.map(str::to_string);
    }

    pub fn set_hold_batch(&self, hold: bool) {
        self.state.lock().hold_batch = hold;
    }

    pub fn requests(&self) -> Vec<BatchModifyRequest> {
        self.state.lock().requests.clone()
    }
}

#[async_trait]
impl BackendOfRecord for MockBackend {
    async fn session_status(&self, _table_id: &str) -> BackendResult<SessionStatus> {
        Ok(self.state.lock().status.clone())
    }

    async fn batch_modify(
        &self,
        _table_id: &str,
        request: &BatchModifyRequest,
    ) -> BackendResult<BatchModifyResponse> {
        let hold = {
            let mut state = self.state.lock();
            state.requests.push(request.clone());
            state.hold_batch
        };
        if hold {
            self.entered.notify_one();
            self.release.notified().await;
        }

        let state = self.state.lock();
        if state.fail_batch {
            return Err(BackendError::Internal("connection reset".into()));
        }
        if let Some(reason) = &state.reject_batch {
            return Ok(BatchModifyResponse {
                success: false,
                updated_lines: vec![],
                message: Some(reason.clone()),
            });
        }
        Ok(BatchModifyResponse {
            success: true,
            updated_lines: vec![],
            message: None,
        })
    }

    async fn active_orders(&self, _table_id: &str) -> BackendResult<Vec<SourceOrderRecord>> {
        Ok(self.state.lock().orders.clone())
    }
}

/// Records highlight/clear calls in order
#[derive(Default)]
pub struct RecordingHighlighter {
    pub events: Mutex<Vec<String>>,
}

impl RowHighlighter for RecordingHighlighter {
    fn highlight(&self, handle: &RowHandle) {
        self.events.lock().push(format!("on:{}", handle));
    }

    fn clear(&self, handle: &RowHandle) {
        self.events.lock().push(format!("off:{}", handle));
    }
}

/// Every rendered row is `row-<menu name>`
pub struct NameRowResolver;

impl RowResolver for NameRowResolver {
    fn resolve(&self, menu_name: &str) -> Option<RowHandle> {
        Some(RowHandle::new(format!("row-{}", menu_name)))
    }
}

pub fn order(order_id: &str, source: OrderSource, items: &[(&str, u32, i64)]) -> SourceOrderRecord {
    SourceOrderRecord {
        order_id: order_id.to_string(),
        source,
        items: items
            .iter()
            .map(|(name, quantity, unit_price)| {
                (
                    name.to_string(),
                    SourceItem {
                        menu_id: Some(format!("m-{}", name)),
                        quantity: *quantity,
                        unit_price: *unit_price,
                    },
                )
            })
            .collect(),
        created_at: Utc::now(),
    }
}

pub fn session(id: &str, device: &str, items: &[(&str, u32, i64)]) -> TableSession {
    let now = Utc::now();
    TableSession {
        session_id: id.to_string(),
        table_id: "7".to_string(),
        store_id: "store-1".to_string(),
        device_label: device.to_string(),
        items: items
            .iter()
            .map(|(name, quantity, price)| {
                (
                    name.to_string(),
                    SessionItem {
                        menu_id: format!("m-{}", name),
                        quantity: *quantity,
                        price: *price,
                    },
                )
            })
            .collect(),
        started_at: now,
        last_modified_at: now,
        session_type: SessionType::Autosave,
    }
}

/// Fried Chicken ×2 and Cola ×1 on one terminal order
pub fn dinner_backend() -> Arc<MockBackend> {
    MockBackend::with_orders(vec![order(
        "t-1",
        OrderSource::Terminal,
        &[("Fried Chicken", 2, 18000), ("Cola", 1, 3000)],
    )])
}

pub fn test_config(dir: &TempDir, policy: ConflictPolicy) -> EditorConfig {
    let mut config =
        EditorConfig::with_overrides(dir.path().to_string_lossy(), "store-1", "counter");
    config.conflict_policy = policy;
    config.max_session_duration_secs = 4 * 3600;
    config.recovery_window_secs = 3600;
    config.autosave_interval_secs = 30;
    config.auto_select_after_add = true;
    config
}

pub fn create_test_editor(
    table_id: &str,
    backend: Arc<MockBackend>,
    config: EditorConfig,
) -> TableEditor {
    let storage = AutosaveStorage::open(config.autosave_db_path()).unwrap();
    TableEditor::new(table_id, config, backend, storage)
}
