//! Order lines, pending changes and derived display lines
//!
//! # Identity
//!
//! `menu_name` is the natural key of every line type in this module. Two lines
//! carrying the same name are the same logical item on a table's ticket; this is
//! the business rule of the restaurant floor, where `menu_id` is only
//! descriptive and may differ between ordering channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Committed lines
// ============================================================================

/// 出餐状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CookingStatus {
    #[default]
    Pending,
    Cooking,
    Ready,
    Served,
    Cancelled,
}

/// A committed order line as last reported by the backend-of-record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub menu_id: String,
    pub menu_name: String,
    /// Unit price in minor currency units
    pub price: i64,
    pub quantity: u32,
    #[serde(default)]
    pub cooking_status: CookingStatus,
    /// Opaque backend references of the tickets this line was built from
    #[serde(default)]
    pub source_ticket_ids: BTreeSet<String>,
}

impl OrderLine {
    pub fn new(
        menu_id: impl Into<String>,
        menu_name: impl Into<String>,
        price: i64,
        quantity: u32,
    ) -> Self {
        Self {
            menu_id: menu_id.into(),
            menu_name: menu_name.into(),
            price,
            quantity,
            cooking_status: CookingStatus::default(),
            source_ticket_ids: BTreeSet::new(),
        }
    }

    /// Line total (quantity × unit price)
    pub fn line_total(&self) -> i64 {
        self.price * i64::from(self.quantity)
    }
}

// ============================================================================
// Pending changes
// ============================================================================

/// 变更类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// Item added from the menu (may not exist in the committed order yet)
    Add,
    /// Quantity change of an existing line
    Modify,
}

/// An unconfirmed quantity change for one menu line
///
/// Never exists with `new_quantity == original_quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingChange {
    pub menu_id: String,
    pub menu_name: String,
    pub price: i64,
    /// Committed quantity at the time the change was first recorded
    pub original_quantity: u32,
    pub new_quantity: u32,
    pub change_type: ChangeType,
    pub last_modified: DateTime<Utc>,
}

impl PendingChange {
    /// Signed quantity difference against the committed line
    pub fn net_delta(&self) -> i64 {
        i64::from(self.new_quantity) - i64::from(self.original_quantity)
    }

    /// True when the change only exists in the ledger (brand-new item)
    pub fn is_new_line(&self) -> bool {
        self.original_quantity == 0
    }
}

// ============================================================================
// Derived views
// ============================================================================

/// One row of the table's current view (committed + pending)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayLine {
    pub menu_id: String,
    pub menu_name: String,
    pub price: i64,
    /// Effective quantity (pending value if modified, committed otherwise)
    pub quantity: u32,
    pub is_modified: bool,
}

/// Edit-mode summary consumed by the presentation layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EditModeState {
    pub is_edit_mode: bool,
    pub has_selection: bool,
    pub pending_change_count: usize,
}

impl EditModeState {
    pub fn new(has_selection: bool, pending_change_count: usize) -> Self {
        Self {
            is_edit_mode: has_selection || pending_change_count > 0,
            has_selection,
            pending_change_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_mode_derivation() {
        assert!(!EditModeState::new(false, 0).is_edit_mode);
        assert!(EditModeState::new(true, 0).is_edit_mode);
        assert!(EditModeState::new(false, 2).is_edit_mode);
    }

    #[test]
    fn test_cooking_status_serde() {
        let json = serde_json::to_string(&CookingStatus::Served).unwrap();
        assert_eq!(json, "\"SERVED\"");
        let line: OrderLine = serde_json::from_str(
            r#"{"menu_id":"m1","menu_name":"Rice","price":2000,"quantity":2}"#,
        )
        .unwrap();
        assert_eq!(line.cooking_status, CookingStatus::Pending);
        assert_eq!(line.line_total(), 4000);
    }

    #[test]
    fn test_pending_change_net_delta() {
        let change = PendingChange {
            menu_id: "m1".to_string(),
            menu_name: "Cola".to_string(),
            price: 3000,
            original_quantity: 1,
            new_quantity: 0,
            change_type: ChangeType::Modify,
            last_modified: Utc::now(),
        };
        assert_eq!(change.net_delta(), -1);
        assert!(!change.is_new_line());
    }
}
