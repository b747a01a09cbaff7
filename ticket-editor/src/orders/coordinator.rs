//! Modification Coordinator
//!
//! Public editing operations over one table's Snapshot Store, Pending Change
//! Ledger and Selection Tracker.
//!
//! # State machine
//!
//! ```text
//! IDLE ──(any edit op)──▶ EDITING ──(confirm_all success | cancel_all)──▶ IDLE
//! ```
//!
//! `EDITING` is exactly `EditModeState::is_edit_mode`: a selection exists or
//! the ledger is non-empty.
//!
//! # Confirm flow
//!
//! ```text
//! confirm_all(backend)
//!     ├─ 1. Empty ledger → NoChanges (no backend call)
//!     ├─ 2. generate_diff(ledger)
//!     ├─ 3. backend.batch_modify(diff)  (one atomic batch)
//!     ├─ 4a. success → merge ledger into snapshot, clear ledger + selection
//!     └─ 4b. failure → ledger + selection untouched, BackendRejected
//! ```

use super::diff::generate_diff;
use super::ledger::{PendingChangeLedger, QuantityUpdate};
use super::selection::{RowHandle, RowHighlighter, Selection, SelectionTracker};
use super::snapshot::SnapshotStore;
use crate::backend::BackendOfRecord;
use crate::core::{EditorError, EditorResult};
use shared::ticket::{
    BatchModifyRequest, ChangeType, DisplayLine, EditModeState, OrderLine, SavedChange,
};
use std::sync::Arc;

/// Best-effort continuation of `add_item`: select the added line once the
/// view has caught up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSelect {
    pub menu_name: String,
}

/// Successful confirm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Lines created, replaced or removed in the snapshot
    pub changed_lines: usize,
    /// The diff that was submitted
    pub diff: BatchModifyRequest,
    /// Lines the backend reported as updated
    pub updated_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Ledger was empty, nothing submitted
    NoChanges,
    Confirmed(Confirmation),
}

#[derive(Debug)]
pub struct ModificationCoordinator {
    order_id: String,
    snapshot: SnapshotStore,
    ledger: PendingChangeLedger,
    selection: SelectionTracker,
}

impl ModificationCoordinator {
    pub fn new(order_id: impl Into<String>, highlighter: Arc<dyn RowHighlighter>) -> Self {
        Self {
            order_id: order_id.into(),
            snapshot: SnapshotStore::new(),
            ledger: PendingChangeLedger::new(),
            selection: SelectionTracker::new(highlighter),
        }
    }

    pub fn with_snapshot(mut self, lines: impl IntoIterator<Item = OrderLine>) -> Self {
        self.snapshot.replace(lines);
        self
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn set_highlighter(&mut self, highlighter: Arc<dyn RowHighlighter>) {
        self.selection.set_highlighter(highlighter);
    }

    pub fn snapshot(&self) -> &SnapshotStore {
        &self.snapshot
    }

    pub fn ledger(&self) -> &PendingChangeLedger {
        &self.ledger
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.current()
    }

    pub fn selected_handle(&self) -> Option<&RowHandle> {
        self.selection.handle()
    }

    /// Replace the committed snapshot (backend refresh or conflict merge)
    ///
    /// Pending changes keep their net delta and are re-anchored on the new
    /// snapshot, so the next confirm still sends what the user asked for.
    pub fn replace_snapshot(&mut self, lines: impl IntoIterator<Item = OrderLine>) {
        self.snapshot.replace(lines);
        self.ledger.rebase(&self.snapshot);
        if let Some(selected) = self.selection.current().map(|s| s.menu_name.clone())
            && self.effective_quantity(&selected) == 0
        {
            self.selection.clear();
        }
    }

    // ========== Views ==========

    /// Effective quantity of a line (pending value, else committed)
    pub fn effective_quantity(&self, menu_name: &str) -> u32 {
        self.ledger.effective_quantity(&self.snapshot, menu_name)
    }

    /// Current table view: committed lines in backend order, then lines that
    /// only exist as pending adds. Zero-quantity lines are omitted.
    pub fn display_lines(&self) -> Vec<DisplayLine> {
        let committed = self.snapshot.lines().iter().map(|line| {
            let pending = self.ledger.get(&line.menu_name);
            DisplayLine {
                menu_id: line.menu_id.clone(),
                menu_name: line.menu_name.clone(),
                price: line.price,
                quantity: pending.map(|c| c.new_quantity).unwrap_or(line.quantity),
                is_modified: pending.is_some(),
            }
        });
        let added = self
            .ledger
            .ordered()
            .into_iter()
            .filter(|c| !self.snapshot.contains(&c.menu_name))
            .map(|c| DisplayLine {
                menu_id: c.menu_id.clone(),
                menu_name: c.menu_name.clone(),
                price: c.price,
                quantity: c.new_quantity,
                is_modified: true,
            });

        committed
            .chain(added)
            .filter(|line| line.quantity > 0)
            .collect()
    }

    pub fn edit_mode_state(&self) -> EditModeState {
        EditModeState::new(self.selection.has_selection(), self.ledger.len())
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode_state().is_edit_mode
    }

    /// Diff that `confirm_all` would submit, for the caller to present
    pub fn preview_diff(&self) -> BatchModifyRequest {
        generate_diff(&self.ledger)
    }

    /// Pending changes in autosave form
    pub fn pending_items(&self) -> Vec<SavedChange> {
        self.ledger.to_saved()
    }

    // ========== Edit operations ==========

    /// Add `quantity` of a menu item
    ///
    /// Returns the quantity update plus an [`AutoSelect`] continuation.
    pub fn add_item(
        &mut self,
        menu_id: &str,
        menu_name: &str,
        price: i64,
        quantity: u32,
    ) -> (QuantityUpdate, AutoSelect) {
        let update = self.ledger.update_quantity(
            &self.snapshot,
            menu_id,
            menu_name,
            price,
            i64::from(quantity),
            ChangeType::Add,
        );
        if self.selection.is_selected(menu_name) {
            self.selection.refresh_quantity(update.new_quantity);
        }
        tracing::debug!(
            menu_name = %menu_name,
            original = update.original_quantity,
            new = update.new_quantity,
            "Item added"
        );
        (
            update,
            AutoSelect {
                menu_name: menu_name.to_string(),
            },
        )
    }

    /// Finish an auto-select: selects the line if it is in the current view
    ///
    /// No-op returning false when the line cannot be resolved.
    pub fn resolve_auto_select(&mut self, pending: AutoSelect, handle: Option<RowHandle>) -> bool {
        let Some(line) = self
            .display_lines()
            .into_iter()
            .find(|l| l.menu_name == pending.menu_name)
        else {
            tracing::debug!(menu_name = %pending.menu_name, "Auto-select skipped: line not in view");
            return false;
        };
        if self.selection.is_selected(&line.menu_name) {
            self.selection.refresh_quantity(line.quantity);
            return true;
        }
        self.selection.select(
            &self.order_id,
            &line.menu_name,
            line.quantity,
            handle,
            &self.snapshot,
        )
    }

    /// Selected line, auto-selecting the first display line when none is
    fn ensure_selection(&mut self) -> EditorResult<Selection> {
        if let Some(selection) = self.selection.current() {
            return Ok(selection.clone());
        }
        let first = self
            .display_lines()
            .into_iter()
            .next()
            .ok_or(EditorError::NoSelection)?;
        self.selection.select(
            &self.order_id,
            &first.menu_name,
            first.quantity,
            None,
            &self.snapshot,
        );
        self.selection
            .current()
            .cloned()
            .ok_or(EditorError::NoSelection)
    }

    /// Identity used for increments of the selected line
    ///
    /// A line that only exists as a pending add carries its menu id and price
    /// in the ledger, not in the snapshot.
    fn selected_identity(&self, selection: &Selection) -> (String, i64) {
        match self.ledger.get(&selection.menu_name) {
            Some(change) if !self.snapshot.contains(&selection.menu_name) => {
                (change.menu_id.clone(), change.price)
            }
            _ => (selection.menu_id.clone(), selection.price),
        }
    }

    pub fn increment_selected(&mut self) -> EditorResult<QuantityUpdate> {
        let selection = self.ensure_selection()?;
        let (menu_id, price) = self.selected_identity(&selection);
        let (update, _) = self.add_item(&menu_id, &selection.menu_name, price, 1);
        Ok(update)
    }

    /// Decrement the selected line by one
    ///
    /// Reaching 0 removes the line from the view and releases the selection.
    /// Gating the removal is the caller's call, see
    /// [`removal_requires_confirmation`](Self::removal_requires_confirmation).
    pub fn decrement_selected(&mut self) -> EditorResult<QuantityUpdate> {
        let selection = self.ensure_selection()?;
        let (menu_id, price) = self.selected_identity(&selection);
        let update = self.ledger.update_quantity(
            &self.snapshot,
            &menu_id,
            &selection.menu_name,
            price,
            -1,
            ChangeType::Modify,
        );
        if update.removed_line() {
            self.selection.clear();
        } else {
            self.selection.refresh_quantity(update.new_quantity);
        }
        tracing::debug!(
            menu_name = %selection.menu_name,
            original = update.original_quantity,
            new = update.new_quantity,
            "Selected line decremented"
        );
        Ok(update)
    }

    /// True when the next decrement would remove the target line
    pub fn removal_requires_confirmation(&self) -> bool {
        let target = match self.selection.current() {
            Some(selection) => Some(self.effective_quantity(&selection.menu_name)),
            None => self.display_lines().first().map(|l| l.quantity),
        };
        target.is_some_and(|quantity| quantity <= 1)
    }

    /// Toggle selection of a line, false when it was deselected
    pub fn toggle_selection(
        &mut self,
        order_id: &str,
        menu_name: &str,
        quantity: u32,
        handle: Option<RowHandle>,
    ) -> bool {
        self.selection
            .toggle(order_id, menu_name, quantity, handle, &self.snapshot)
    }

    /// Select a line unconditionally
    pub fn select(&mut self, menu_name: &str, handle: Option<RowHandle>) -> bool {
        let quantity = self.effective_quantity(menu_name);
        let order_id = self.order_id.clone();
        self.selection
            .select(&order_id, menu_name, quantity, handle, &self.snapshot)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Discard all pending changes and the selection, returns how many changes
    /// were dropped. No backend call.
    pub fn cancel_all(&mut self) -> usize {
        let discarded = self.ledger.clear();
        self.selection.clear();
        if discarded > 0 {
            tracing::info!(order_id = %self.order_id, discarded, "Pending changes cancelled");
        }
        discarded
    }

    /// Re-apply autosaved changes, returns how many became pending
    pub fn restore(&mut self, items: &[SavedChange]) -> usize {
        items
            .iter()
            .filter(|saved| self.ledger.restore(&self.snapshot, saved))
            .count()
    }

    /// Submit all pending changes as one batch
    pub async fn confirm_all(
        &mut self,
        backend: &dyn BackendOfRecord,
        table_id: &str,
    ) -> EditorResult<ConfirmOutcome> {
        if self.ledger.is_empty() {
            tracing::info!(table_id = %table_id, "Confirm requested with no pending changes");
            return Ok(ConfirmOutcome::NoChanges);
        }

        let diff = generate_diff(&self.ledger);
        let response = match backend.batch_modify(table_id, &diff).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    table_id = %table_id,
                    error = %e,
                    pending = self.ledger.len(),
                    "batch-modify failed, pending changes kept"
                );
                return Err(EditorError::BackendRejected(e.to_string()));
            }
        };
        if !response.success {
            let reason = response
                .message
                .unwrap_or_else(|| "batch-modify rejected".to_string());
            tracing::warn!(table_id = %table_id, reason = %reason, "batch-modify rejected, pending changes kept");
            return Err(EditorError::BackendRejected(reason));
        }

        let changed_lines = self.snapshot.apply_changes(self.ledger.iter());
        self.ledger.clear();
        self.selection.clear();
        tracing::info!(
            table_id = %table_id,
            changed_lines,
            additions = diff.additions.len(),
            removals = diff.removals.len(),
            "Pending changes confirmed"
        );

        Ok(ConfirmOutcome::Confirmed(Confirmation {
            changed_lines,
            diff,
            updated_lines: response.updated_lines.len(),
        }))
    }
}
