//! TableEditor - 单桌编辑会话
//!
//! One explicit handle per table being edited on this terminal. It owns the
//! [`ModificationCoordinator`] behind a `tokio::sync::Mutex`, so every public
//! operation is serialized:
//!
//! - `confirm_all` holds the lock across the backend call
//! - `cancel_all` issued meanwhile waits for that confirm to resolve, then
//!   discards whatever is still pending
//! - the autosave worker only `try_lock`s and skips busy ticks
//!
//! # Lifecycle
//!
//! ```text
//! new / from_config
//!     → load()                  snapshot from active-orders
//!     → validate_before_edit()  conflict policy, may replace the snapshot
//!     → recover() / restore()   optional autosave resurrection
//!     → start_autosave()
//!     → edits ... confirm_all() | cancel_all()   (both run cleanup)
//! ```

use crate::backend::{BackendOfRecord, HttpBackend};
use crate::consolidation::{self, Consolidation};
use crate::core::{EditorConfig, EditorError, EditorResult};
use crate::orders::{
    ConfirmOutcome, ModificationCoordinator, NoopHighlighter, QuantityUpdate, RowHandle,
    RowHighlighter, RowResolver,
};
use crate::session::{
    AutosaveHandle, AutosaveStorage, AutosaveWorker, ConflictPrompter, EditBlockReason,
    EditValidation, RecoveredSession, SessionConflictResolver,
};
use chrono::{DateTime, Utc};
use shared::ticket::{BatchModifyRequest, DisplayLine, EditModeState, TableSession};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Whether edits are currently allowed
#[derive(Debug, Clone, PartialEq)]
pub enum EditGate {
    Open,
    Expired,
    /// Prompt policy without an answer
    Unresolved(Vec<TableSession>),
    /// User cancelled at the conflict prompt
    Cancelled,
}

/// Result of [`TableEditor::add_item`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddedItem {
    pub update: QuantityUpdate,
    /// The added line became the selection
    pub auto_selected: bool,
}

pub struct TableEditor {
    table_id: String,
    session_id: String,
    started_at: DateTime<Utc>,
    config: EditorConfig,
    backend: Arc<dyn BackendOfRecord>,
    resolver: SessionConflictResolver,
    coordinator: Arc<Mutex<ModificationCoordinator>>,
    gate: parking_lot::Mutex<EditGate>,
    autosave: parking_lot::Mutex<Option<AutosaveHandle>>,
    shutdown: CancellationToken,
    row_resolver: Option<Arc<dyn RowResolver>>,
    /// Last computed mixed-order state of the table
    mixed_order: AtomicBool,
    /// Mixed flag as last reported by session-status
    backend_mixed: AtomicBool,
}

impl std::fmt::Debug for TableEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableEditor")
            .field("table_id", &self.table_id)
            .field("session_id", &self.session_id)
            .field("started_at", &self.started_at)
            .field("gate", &*self.gate.lock())
            .finish_non_exhaustive()
    }
}

impl TableEditor {
    pub fn new(
        table_id: impl Into<String>,
        config: EditorConfig,
        backend: Arc<dyn BackendOfRecord>,
        storage: AutosaveStorage,
    ) -> Self {
        let table_id = table_id.into();
        let resolver = SessionConflictResolver::new(config.clone(), backend.clone(), storage);
        let coordinator = ModificationCoordinator::new(table_id.clone(), Arc::new(NoopHighlighter));
        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(table_id = %table_id, session_id = %session_id, "Editing session created");

        Self {
            table_id,
            session_id,
            started_at: Utc::now(),
            config,
            backend,
            resolver,
            coordinator: Arc::new(Mutex::new(coordinator)),
            gate: parking_lot::Mutex::new(EditGate::Open),
            autosave: parking_lot::Mutex::new(None),
            shutdown: CancellationToken::new(),
            row_resolver: None,
            mixed_order: AtomicBool::new(false),
            backend_mixed: AtomicBool::new(false),
        }
    }

    /// HTTP backend + on-disk autosave store from configuration
    pub fn from_config(table_id: impl Into<String>, config: EditorConfig) -> EditorResult<Self> {
        let backend = HttpBackend::from_config(&config)?;
        let storage = AutosaveStorage::open(config.autosave_db_path())?;
        Ok(Self::new(table_id, config, Arc::new(backend), storage))
    }

    /// Presentation-layer row highlighting
    ///
    /// Snapshot, pending changes and selection are kept.
    pub fn with_highlighter(mut self, highlighter: Arc<dyn RowHighlighter>) -> Self {
        match Arc::get_mut(&mut self.coordinator) {
            Some(coordinator) => coordinator.get_mut().set_highlighter(highlighter),
            None => match self.coordinator.try_lock() {
                Ok(mut coordinator) => coordinator.set_highlighter(highlighter),
                Err(_) => tracing::warn!(
                    table_id = %self.table_id,
                    "Editor busy, highlighter not replaced; use set_highlighter"
                ),
            },
        }
        self
    }

    /// Replace the highlighter of a running editor
    pub async fn set_highlighter(&self, highlighter: Arc<dyn RowHighlighter>) {
        self.coordinator.lock().await.set_highlighter(highlighter);
    }

    /// Resolves row handles for auto-select after add
    pub fn with_row_resolver(mut self, resolver: Arc<dyn RowResolver>) -> Self {
        self.row_resolver = Some(resolver);
        self
    }

    pub fn with_prompter(mut self, prompter: Arc<dyn ConflictPrompter>) -> Self {
        self.resolver.set_prompter(prompter);
        self
    }

    /// Resume a session that started earlier
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn gate(&self) -> EditGate {
        self.gate.lock().clone()
    }

    pub fn is_mixed_order(&self) -> bool {
        self.mixed_order.load(Ordering::Relaxed)
    }

    fn check_gate(&self) -> EditorResult<()> {
        let mut gate = self.gate.lock();
        if *gate == EditGate::Open && Utc::now() - self.started_at > self.config.max_session_duration()
        {
            tracing::warn!(table_id = %self.table_id, "Session expired while editing");
            *gate = EditGate::Expired;
        }
        match &*gate {
            EditGate::Open => Ok(()),
            EditGate::Expired => Err(EditorError::SessionExpired(self.table_id.clone())),
            EditGate::Unresolved(conflicts) => Err(EditorError::ConflictUnresolved {
                table_id: self.table_id.clone(),
                conflicts: conflicts.clone(),
            }),
            EditGate::Cancelled => Err(EditorError::EditCancelled(self.table_id.clone())),
        }
    }

    // ========== Backend reads ==========

    /// Refresh the committed snapshot from the active orders of the table
    ///
    /// Returns the table's consolidated view (source-tagged when mixed).
    pub async fn load(&self) -> EditorResult<Consolidation> {
        let records = self.backend.active_orders(&self.table_id).await?;
        let mixed =
            consolidation::is_mixed_order(&records, self.backend_mixed.load(Ordering::Relaxed));
        self.mixed_order.store(mixed, Ordering::Relaxed);

        let lines = consolidation::to_order_lines(&consolidation::consolidate(&records, false));
        let line_count = lines.len();
        self.coordinator.lock().await.replace_snapshot(lines);
        tracing::info!(
            table_id = %self.table_id,
            orders = records.len(),
            lines = line_count,
            mixed,
            "Snapshot loaded"
        );

        Ok(consolidation::consolidate(&records, mixed))
    }

    /// Consolidated view of all source orders, without touching the snapshot
    pub async fn consolidated_view(&self) -> EditorResult<Consolidation> {
        let records = self.backend.active_orders(&self.table_id).await?;
        Ok(consolidation::consolidate_for_table(
            &records,
            self.backend_mixed.load(Ordering::Relaxed),
        ))
    }

    /// Run the conflict policy and update the edit gate
    ///
    /// A merge result replaces the working snapshot; pending changes keep
    /// their net delta on top of it.
    pub async fn validate_before_edit(&self) -> EditorResult<EditValidation> {
        let validation = match self
            .resolver
            .validate_before_edit(&self.table_id, self.started_at)
            .await
        {
            Ok(validation) => validation,
            Err(EditorError::ConflictUnresolved { table_id, conflicts }) => {
                *self.gate.lock() = EditGate::Unresolved(conflicts.clone());
                return Err(EditorError::ConflictUnresolved { table_id, conflicts });
            }
            Err(e) => return Err(e),
        };

        *self.gate.lock() = match validation.reason {
            None => EditGate::Open,
            Some(EditBlockReason::SessionExpired) => EditGate::Expired,
            Some(EditBlockReason::Cancelled) => EditGate::Cancelled,
        };
        // an expired session never reached session-status
        if validation.reason != Some(EditBlockReason::SessionExpired) {
            self.backend_mixed
                .store(validation.is_mixed_order, Ordering::Relaxed);
            if validation.is_mixed_order {
                self.mixed_order.store(true, Ordering::Relaxed);
            }
        }
        if let Some(lines) = &validation.merged_lines {
            self.coordinator.lock().await.replace_snapshot(lines.iter().cloned());
        }
        Ok(validation)
    }

    // ========== Views ==========

    pub async fn display_lines(&self) -> Vec<DisplayLine> {
        self.coordinator.lock().await.display_lines()
    }

    pub async fn edit_mode_state(&self) -> EditModeState {
        self.coordinator.lock().await.edit_mode_state()
    }

    pub async fn preview_diff(&self) -> BatchModifyRequest {
        self.coordinator.lock().await.preview_diff()
    }

    pub async fn effective_quantity(&self, menu_name: &str) -> u32 {
        self.coordinator.lock().await.effective_quantity(menu_name)
    }

    pub async fn selected_line(&self) -> Option<(String, Option<RowHandle>)> {
        let coordinator = self.coordinator.lock().await;
        coordinator
            .selection()
            .map(|s| (s.menu_name.clone(), coordinator.selected_handle().cloned()))
    }

    pub async fn removal_requires_confirmation(&self) -> bool {
        self.coordinator.lock().await.removal_requires_confirmation()
    }

    // ========== Edits ==========

    pub async fn add_item(
        &self,
        menu_id: &str,
        menu_name: &str,
        price: i64,
        quantity: u32,
    ) -> EditorResult<AddedItem> {
        self.check_gate()?;
        let mut coordinator = self.coordinator.lock().await;
        let (update, pending) = coordinator.add_item(menu_id, menu_name, price, quantity);

        let auto_selected = if self.config.auto_select_after_add {
            let handle = self
                .row_resolver
                .as_ref()
                .and_then(|resolver| resolver.resolve(menu_name));
            coordinator.resolve_auto_select(pending, handle)
        } else {
            false
        };
        Ok(AddedItem {
            update,
            auto_selected,
        })
    }

    pub async fn increment_selected(&self) -> EditorResult<QuantityUpdate> {
        self.check_gate()?;
        self.coordinator.lock().await.increment_selected()
    }

    pub async fn decrement_selected(&self) -> EditorResult<QuantityUpdate> {
        self.check_gate()?;
        self.coordinator.lock().await.decrement_selected()
    }

    /// Toggle the selection of a line, true when it is now selected
    pub async fn toggle_selection(
        &self,
        menu_name: &str,
        handle: Option<RowHandle>,
    ) -> EditorResult<bool> {
        self.check_gate()?;
        let mut coordinator = self.coordinator.lock().await;
        let quantity = coordinator.effective_quantity(menu_name);
        Ok(coordinator.toggle_selection(&self.table_id, menu_name, quantity, handle))
    }

    pub async fn clear_selection(&self) {
        self.coordinator.lock().await.clear_selection();
    }

    /// Re-apply a recovered autosave, returns how many changes became pending
    pub async fn restore(&self, session: &RecoveredSession) -> EditorResult<usize> {
        self.check_gate()?;
        let restored = self.coordinator.lock().await.restore(&session.items);
        tracing::info!(
            table_id = %self.table_id,
            restored,
            saved = session.items.len(),
            "Autosave restored"
        );
        Ok(restored)
    }

    // ========== Confirm / cancel ==========

    /// Submit all pending changes as one batch
    ///
    /// On failure nothing changes locally and the caller may retry.
    pub async fn confirm_all(&self) -> EditorResult<ConfirmOutcome> {
        let outcome = {
            let mut coordinator = self.coordinator.lock().await;
            coordinator
                .confirm_all(self.backend.as_ref(), &self.table_id)
                .await?
        };
        if matches!(outcome, ConfirmOutcome::Confirmed(_)) {
            self.cleanup_logged();
        }
        Ok(outcome)
    }

    /// Discard all pending changes, no backend call
    ///
    /// Waits for an in-flight confirm first.
    pub async fn cancel_all(&self) -> usize {
        let discarded = self.coordinator.lock().await.cancel_all();
        self.cleanup_logged();
        discarded
    }

    // ========== Autosave / recovery ==========

    pub fn recover(&self) -> EditorResult<Option<RecoveredSession>> {
        self.resolver.recover(&self.table_id)
    }

    /// Save the pending changes right away (explicit session)
    pub async fn save_now(&self) -> EditorResult<bool> {
        let items = self.coordinator.lock().await.pending_items();
        self.resolver.save_explicit(&self.table_id, &items)
    }

    /// Start the periodic autosave task (no-op when already running)
    pub fn start_autosave(&self) {
        let mut slot = self.autosave.lock();
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let worker = AutosaveWorker::new(
            self.table_id.clone(),
            self.coordinator.clone(),
            self.resolver.clone(),
            self.config.autosave_interval(),
            self.shutdown.child_token(),
        );
        *slot = Some(worker.spawn());
    }

    pub fn is_autosave_running(&self) -> bool {
        self.autosave
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop the autosave task and delete the table's autosave
    pub fn cleanup(&self) -> EditorResult<bool> {
        if let Some(handle) = self.autosave.lock().take() {
            handle.stop();
        }
        let removed = self.resolver.cleanup(&self.table_id)?;
        tracing::debug!(table_id = %self.table_id, removed, "Session cleaned up");
        Ok(removed)
    }

    fn cleanup_logged(&self) {
        if let Err(e) = self.cleanup() {
            tracing::warn!(table_id = %self.table_id, error = %e, "Session cleanup failed");
        }
    }
}

impl Drop for TableEditor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
