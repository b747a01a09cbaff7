//! Session Conflict Resolver
//!
//! 编辑前校验 + 本地 autosave / 恢复
//!
//! # validate_before_edit
//!
//! ```text
//! validate_before_edit(table_id, started_at)
//!     ├─ 1. local session older than max_session_duration → blocked (SessionExpired)
//!     ├─ 2. backend session-status
//!     ├─ 3. sessions of other devices → conflicts
//!     └─ 4. policy
//!           ├─ Merge     → merged_lines = Σ all reported sessions
//!           ├─ Overwrite → ignore other sessions
//!           └─ Prompt    → ConflictPrompter decides (Cancel → blocked)
//! ```

use super::merge::merged_lines;
use super::storage::AutosaveStorage;
use crate::backend::BackendOfRecord;
use crate::core::{ConflictPolicy, EditorConfig, EditorError, EditorResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::ticket::{AutosaveRecord, OrderLine, SavedChange, SessionType, TableSession};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Answer to a conflict prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    Merge,
    Overwrite,
    Cancel,
}

/// Asks the user how to handle other devices editing the same table
#[async_trait]
pub trait ConflictPrompter: Send + Sync {
    /// `None` means the prompt was dismissed without an answer
    async fn choose(&self, table_id: &str, conflicts: &[TableSession]) -> Option<ConflictChoice>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditBlockReason {
    /// Local session exceeded the maximum duration, a fresh session is needed
    SessionExpired,
    /// User cancelled at the conflict prompt
    Cancelled,
}

/// How conflicting sessions were handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    NoConflict,
    Merged,
    Overwritten,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditValidation {
    pub can_edit: bool,
    pub reason: Option<EditBlockReason>,
    pub active_session: Option<TableSession>,
    /// Sessions of other devices on this table
    pub conflicts: Vec<TableSession>,
    pub resolution: ConflictResolution,
    /// New working snapshot when sessions were merged
    pub merged_lines: Option<Vec<OrderLine>>,
    pub is_mixed_order: bool,
}

impl EditValidation {
    fn blocked(reason: EditBlockReason) -> Self {
        Self {
            can_edit: false,
            reason: Some(reason),
            active_session: None,
            conflicts: Vec::new(),
            resolution: ConflictResolution::NoConflict,
            merged_lines: None,
            is_mixed_order: false,
        }
    }
}

/// Autosave offered back to the user on re-entry
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredSession {
    pub table_id: String,
    pub items: Vec<SavedChange>,
    pub last_modified_at: DateTime<Utc>,
    pub age: chrono::Duration,
    pub session_type: SessionType,
}

#[derive(Clone)]
pub struct SessionConflictResolver {
    config: EditorConfig,
    backend: Arc<dyn BackendOfRecord>,
    storage: AutosaveStorage,
    prompter: Option<Arc<dyn ConflictPrompter>>,
    /// Timer writes and cleanup never interleave (shared by clones)
    writes: Arc<parking_lot::Mutex<()>>,
}

impl std::fmt::Debug for SessionConflictResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConflictResolver")
            .field("store_id", &self.config.store_id)
            .field("device_label", &self.config.device_label)
            .field("policy", &self.config.conflict_policy)
            .field("has_prompter", &self.prompter.is_some())
            .finish()
    }
}

impl SessionConflictResolver {
    pub fn new(
        config: EditorConfig,
        backend: Arc<dyn BackendOfRecord>,
        storage: AutosaveStorage,
    ) -> Self {
        Self {
            config,
            backend,
            storage,
            prompter: None,
            writes: Arc::new(parking_lot::Mutex::new(())),
        }
    }

    pub fn with_prompter(mut self, prompter: Arc<dyn ConflictPrompter>) -> Self {
        self.set_prompter(prompter);
        self
    }

    pub fn set_prompter(&mut self, prompter: Arc<dyn ConflictPrompter>) {
        self.prompter = Some(prompter);
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn storage(&self) -> &AutosaveStorage {
        &self.storage
    }

    fn storage_key(&self, table_id: &str) -> String {
        AutosaveRecord::storage_key(&self.config.store_id, table_id)
    }

    /// Check whether this device may start (or keep) editing the table
    pub async fn validate_before_edit(
        &self,
        table_id: &str,
        started_at: DateTime<Utc>,
    ) -> EditorResult<EditValidation> {
        let elapsed = Utc::now() - started_at;
        if elapsed > self.config.max_session_duration() {
            tracing::warn!(
                table_id = %table_id,
                elapsed_secs = elapsed.num_seconds(),
                "Local session expired, edits blocked"
            );
            return Ok(EditValidation::blocked(EditBlockReason::SessionExpired));
        }

        let status = self.backend.session_status(table_id).await?;

        // 去重：session_info 也可能出现在 conflicting_sessions 中
        let mut seen = HashSet::new();
        let sessions: Vec<TableSession> = status
            .session_info
            .iter()
            .chain(status.conflicting_sessions.iter())
            .filter(|s| seen.insert(s.session_id.clone()))
            .cloned()
            .collect();
        let conflicts: Vec<TableSession> = sessions
            .iter()
            .filter(|s| s.device_label != self.config.device_label)
            .cloned()
            .collect();

        let mut validation = EditValidation {
            can_edit: true,
            reason: None,
            active_session: status.session_info.clone(),
            conflicts: Vec::new(),
            resolution: ConflictResolution::NoConflict,
            merged_lines: None,
            is_mixed_order: status.is_mixed_order,
        };

        if conflicts.is_empty() {
            return Ok(validation);
        }

        let choice = match self.config.conflict_policy {
            ConflictPolicy::Merge => ConflictChoice::Merge,
            ConflictPolicy::Overwrite => ConflictChoice::Overwrite,
            ConflictPolicy::Prompt => {
                let answer = match &self.prompter {
                    Some(prompter) => prompter.choose(table_id, &conflicts).await,
                    None => None,
                };
                answer.ok_or_else(|| EditorError::ConflictUnresolved {
                    table_id: table_id.to_string(),
                    conflicts: conflicts.clone(),
                })?
            }
        };

        tracing::info!(
            table_id = %table_id,
            conflicts = conflicts.len(),
            choice = ?choice,
            "Resolving session conflict"
        );

        match choice {
            ConflictChoice::Merge => {
                validation.resolution = ConflictResolution::Merged;
                validation.merged_lines = Some(merged_lines(&sessions));
            }
            ConflictChoice::Overwrite => {
                validation.resolution = ConflictResolution::Overwritten;
            }
            ConflictChoice::Cancel => {
                validation.can_edit = false;
                validation.reason = Some(EditBlockReason::Cancelled);
            }
        }
        validation.conflicts = conflicts;
        Ok(validation)
    }

    /// Persist the pending changes of a table (timer tick)
    ///
    /// Returns false without touching storage when there is nothing pending.
    pub fn autosave(&self, table_id: &str, items: &[SavedChange]) -> EditorResult<bool> {
        self.persist(table_id, items, SessionType::Autosave)
    }

    /// Timer write that loses against a concurrent cleanup
    ///
    /// The shutdown token is checked under the write lock that
    /// [`cleanup`](Self::cleanup) also takes, so once a cleanup has cancelled
    /// the token no stale write can recreate the entry. Returns false when
    /// shutdown was requested or nothing is pending.
    pub fn autosave_unless_cancelled(
        &self,
        table_id: &str,
        items: &[SavedChange],
        shutdown: &CancellationToken,
    ) -> EditorResult<bool> {
        let _writes = self.writes.lock();
        if shutdown.is_cancelled() {
            tracing::debug!(table_id = %table_id, "Autosave dropped: session closed");
            return Ok(false);
        }
        self.persist(table_id, items, SessionType::Autosave)
    }

    /// Persist on explicit request
    pub fn save_explicit(&self, table_id: &str, items: &[SavedChange]) -> EditorResult<bool> {
        self.persist(table_id, items, SessionType::Explicit)
    }

    fn persist(
        &self,
        table_id: &str,
        items: &[SavedChange],
        session_type: SessionType,
    ) -> EditorResult<bool> {
        if items.is_empty() {
            return Ok(false);
        }
        let record = AutosaveRecord {
            table_id: table_id.to_string(),
            store_id: self.config.store_id.clone(),
            items: items.to_vec(),
            last_modified_at: Utc::now(),
            session_type,
        };
        self.storage.save(&record)?;
        tracing::debug!(table_id = %table_id, items = items.len(), "Session saved");
        Ok(true)
    }

    /// Autosave still inside the recovery window, if any
    ///
    /// Older entries are deleted.
    pub fn recover(&self, table_id: &str) -> EditorResult<Option<RecoveredSession>> {
        let key = self.storage_key(table_id);
        let Some(record) = self.storage.load(&key)? else {
            return Ok(None);
        };

        let age = Utc::now() - record.last_modified_at;
        if age >= self.config.recovery_window() || record.items.is_empty() {
            self.storage.remove(&key)?;
            tracing::info!(
                table_id = %table_id,
                age_secs = age.num_seconds(),
                "Discarded stale autosave"
            );
            return Ok(None);
        }

        tracing::info!(
            table_id = %table_id,
            items = record.items.len(),
            age_secs = age.num_seconds(),
            "Recoverable autosave found"
        );
        Ok(Some(RecoveredSession {
            table_id: record.table_id,
            items: record.items,
            last_modified_at: record.last_modified_at,
            age,
            session_type: record.session_type,
        }))
    }

    /// Remove the autosave of a table, returns whether one existed
    pub fn cleanup(&self, table_id: &str) -> EditorResult<bool> {
        let _writes = self.writes.lock();
        Ok(self.storage.remove(&self.storage_key(table_id))?)
    }

    /// Blocks timer writes while held
    #[cfg(test)]
    pub(crate) fn hold_writes(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.writes.lock()
    }
}
