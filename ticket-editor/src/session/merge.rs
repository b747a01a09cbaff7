//! 多终端会话合并
//!
//! Quantities of the same menu line are summed across sessions, so the
//! operation is commutative and associative. The price of a line is taken
//! from the first session that carries it; a different price in a later
//! session is logged and otherwise ignored.

use shared::ticket::{OrderLine, SessionItem, TableSession};
use std::collections::BTreeMap;

/// Merge the items of all given sessions, keyed by menu name
pub fn merge_sessions(sessions: &[TableSession]) -> BTreeMap<String, SessionItem> {
    let mut merged: BTreeMap<String, SessionItem> = BTreeMap::new();

    for session in sessions {
        for (name, item) in &session.items {
            match merged.get_mut(name) {
                Some(existing) => {
                    if existing.price != item.price {
                        tracing::warn!(
                            menu_name = %name,
                            session_id = %session.session_id,
                            kept_price = existing.price,
                            session_price = item.price,
                            "Conflicting sessions disagree on price, keeping the first"
                        );
                    }
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                    if existing.menu_id.is_empty() {
                        existing.menu_id = item.menu_id.clone();
                    }
                }
                None => {
                    merged.insert(name.clone(), item.clone());
                }
            }
        }
    }

    merged
}

/// Merged items as snapshot lines (zero quantities dropped)
pub fn merged_lines(sessions: &[TableSession]) -> Vec<OrderLine> {
    merge_sessions(sessions)
        .into_iter()
        .filter(|(_, item)| item.quantity > 0)
        .map(|(name, item)| {
            let menu_id = if item.menu_id.is_empty() {
                name.clone()
            } else {
                item.menu_id
            };
            OrderLine::new(menu_id, name, item.price, item.quantity)
        })
        .collect()
}
