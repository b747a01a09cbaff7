//! Editing sessions and local autosave records

use super::line::{ChangeType, PendingChange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 会话类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    /// Written by the periodic autosave timer
    #[default]
    Autosave,
    /// Written on an explicit user/system request
    Explicit,
}

/// Quantity/price of one menu line inside a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionItem {
    #[serde(default)]
    pub menu_id: String,
    pub quantity: u32,
    pub price: i64,
}

/// One device's in-progress edit of one table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSession {
    pub session_id: String,
    pub table_id: String,
    pub store_id: String,
    /// Human readable device name shown in conflict prompts
    pub device_label: String,
    /// Items keyed by menu name
    #[serde(default)]
    pub items: BTreeMap<String, SessionItem>,
    pub started_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    #[serde(default)]
    pub session_type: SessionType,
}

/// Result of the backend `session-status` query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SessionStatus {
    pub has_active_session: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_info: Option<TableSession>,
    #[serde(default)]
    pub conflicting_sessions: Vec<TableSession>,
    /// Backend flag: the table is logically a mixed (multi-channel) order
    #[serde(default)]
    pub is_mixed_order: bool,
}

/// One pending change as persisted in an autosave
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedChange {
    pub menu_id: String,
    pub menu_name: String,
    pub price: i64,
    pub original_quantity: u32,
    pub new_quantity: u32,
    pub change_type: ChangeType,
}

impl From<&PendingChange> for SavedChange {
    fn from(change: &PendingChange) -> Self {
        Self {
            menu_id: change.menu_id.clone(),
            menu_name: change.menu_name.clone(),
            price: change.price,
            original_quantity: change.original_quantity,
            new_quantity: change.new_quantity,
            change_type: change.change_type,
        }
    }
}

/// Value stored in the local durable store under `store_id:table_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutosaveRecord {
    pub table_id: String,
    pub store_id: String,
    pub items: Vec<SavedChange>,
    pub last_modified_at: DateTime<Utc>,
    #[serde(default)]
    pub session_type: SessionType,
}

impl AutosaveRecord {
    /// Storage key for a table
    pub fn storage_key(store_id: &str, table_id: &str) -> String {
        format!("{}:{}", store_id, table_id)
    }

    pub fn key(&self) -> String {
        Self::storage_key(&self.store_id, &self.table_id)
    }
}
