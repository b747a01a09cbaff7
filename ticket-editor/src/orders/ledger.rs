//! Pending Change Ledger
//!
//! Uncommitted quantity deltas keyed by menu name. The effective quantity of a
//! line is the pending `new_quantity` when present, the committed snapshot
//! quantity otherwise.
//!
//! Invariant: an entry whose `new_quantity` equals its `original_quantity` is
//! removed the moment the two become equal, so the ledger only ever holds real
//! changes.

use super::snapshot::SnapshotStore;
use chrono::Utc;
use shared::ticket::{ChangeType, PendingChange, SavedChange};
use std::collections::HashMap;

/// Result of a quantity update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityUpdate {
    pub original_quantity: u32,
    pub new_quantity: u32,
}

impl QuantityUpdate {
    /// Line no longer visible after this update
    pub fn removed_line(&self) -> bool {
        self.new_quantity == 0
    }
}

/// Clamp a signed quantity into `0..=u32::MAX`
fn clamp_quantity(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

fn net_delta(original: u32, new: u32) -> i64 {
    i64::from(new) - i64::from(original)
}

#[derive(Debug, Clone, Default)]
pub struct PendingChangeLedger {
    changes: HashMap<String, PendingChange>,
}

impl PendingChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a signed delta to one line
    ///
    /// `menu_id` and `price` are descriptive; identity is `menu_name`. The
    /// result is clamped at 0, never rejected.
    pub fn update_quantity(
        &mut self,
        snapshot: &SnapshotStore,
        menu_id: &str,
        menu_name: &str,
        price: i64,
        delta: i64,
        change_type: ChangeType,
    ) -> QuantityUpdate {
        let original_quantity = match self.changes.get(menu_name) {
            Some(existing) => existing.original_quantity,
            None => snapshot.quantity_of(menu_name),
        };
        let current_quantity = self
            .changes
            .get(menu_name)
            .map(|c| c.new_quantity)
            .unwrap_or(original_quantity);
        let new_quantity = clamp_quantity(i64::from(current_quantity) + delta);

        if new_quantity == original_quantity {
            if self.changes.remove(menu_name).is_some() {
                tracing::debug!(menu_name = %menu_name, "Pending change reverted to original");
            }
        } else {
            self.changes.insert(
                menu_name.to_string(),
                PendingChange {
                    menu_id: menu_id.to_string(),
                    menu_name: menu_name.to_string(),
                    price,
                    original_quantity,
                    new_quantity,
                    change_type,
                    last_modified: Utc::now(),
                },
            );
        }

        QuantityUpdate {
            original_quantity,
            new_quantity,
        }
    }

    /// Effective quantity of a line given the committed snapshot
    pub fn effective_quantity(&self, snapshot: &SnapshotStore, menu_name: &str) -> u32 {
        self.changes
            .get(menu_name)
            .map(|c| c.new_quantity)
            .unwrap_or_else(|| snapshot.quantity_of(menu_name))
    }

    pub fn get(&self, menu_name: &str) -> Option<&PendingChange> {
        self.changes.get(menu_name)
    }

    pub fn contains(&self, menu_name: &str) -> bool {
        self.changes.contains_key(menu_name)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Unordered iteration over all pending changes
    pub fn iter(&self) -> impl Iterator<Item = &PendingChange> {
        self.changes.values()
    }

    /// Pending changes ordered by modification time, then name
    pub fn ordered(&self) -> Vec<&PendingChange> {
        let mut changes: Vec<_> = self.changes.values().collect();
        changes.sort_by(|a, b| {
            a.last_modified
                .cmp(&b.last_modified)
                .then_with(|| a.menu_name.cmp(&b.menu_name))
        });
        changes
    }

    /// Drop every pending change, returns how many were discarded
    pub fn clear(&mut self) -> usize {
        let count = self.changes.len();
        self.changes.clear();
        count
    }

    /// Re-anchor pending changes after the snapshot was replaced
    ///
    /// Each change keeps its net delta (what the user asked for) on top of the
    /// new committed quantity; entries whose delta clamps away are dropped.
    pub fn rebase(&mut self, snapshot: &SnapshotStore) {
        self.changes.retain(|name, change| {
            let delta = net_delta(change.original_quantity, change.new_quantity);
            change.original_quantity = snapshot.quantity_of(name);
            change.new_quantity = clamp_quantity(i64::from(change.original_quantity) + delta);
            change.new_quantity != change.original_quantity
        });
    }

    /// Load a previously saved change (autosave recovery)
    ///
    /// The saved delta is replayed on the current snapshot. Returns false when
    /// it is a no-op against the snapshot.
    pub fn restore(&mut self, snapshot: &SnapshotStore, saved: &SavedChange) -> bool {
        let original_quantity = snapshot.quantity_of(&saved.menu_name);
        let new_quantity = clamp_quantity(
            i64::from(original_quantity) + net_delta(saved.original_quantity, saved.new_quantity),
        );
        if new_quantity == original_quantity {
            self.changes.remove(&saved.menu_name);
            return false;
        }
        self.changes.insert(
            saved.menu_name.clone(),
            PendingChange {
                menu_id: saved.menu_id.clone(),
                menu_name: saved.menu_name.clone(),
                price: saved.price,
                original_quantity,
                new_quantity,
                change_type: saved.change_type,
                last_modified: Utc::now(),
            },
        );
        true
    }

    /// Snapshot of the ledger for autosave
    pub fn to_saved(&self) -> Vec<SavedChange> {
        self.ordered().into_iter().map(SavedChange::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::diff::generate_diff;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use shared::ticket::OrderLine;

    fn snapshot() -> SnapshotStore {
        SnapshotStore::from_lines([
            OrderLine::new("m1", "Fried Chicken", 18000, 2),
            OrderLine::new("m2", "Cola", 3000, 1),
        ])
    }

    #[test]
    fn test_increment_existing_line() {
        let snap = snapshot();
        let mut ledger = PendingChangeLedger::new();

        let update = ledger.update_quantity(&snap, "m1", "Fried Chicken", 18000, 1, ChangeType::Add);

        assert_eq!(update.original_quantity, 2);
        assert_eq!(update.new_quantity, 3);
        let change = ledger.get("Fried Chicken").unwrap();
        assert_eq!(change.original_quantity, 2);
        assert_eq!(change.new_quantity, 3);
        assert_eq!(ledger.effective_quantity(&snap, "Fried Chicken"), 3);
    }

    #[test]
    fn test_new_item_starts_from_zero() {
        let snap = snapshot();
        let mut ledger = PendingChangeLedger::new();

        let update = ledger.update_quantity(&snap, "m9", "Beer", 5000, 2, ChangeType::Add);

        assert_eq!(update.original_quantity, 0);
        assert_eq!(update.new_quantity, 2);
        assert!(ledger.get("Beer").unwrap().is_new_line());
    }

    #[test]
    fn test_back_to_original_removes_entry() {
        let snap = snapshot();
        let mut ledger = PendingChangeLedger::new();

        ledger.update_quantity(&snap, "m1", "Fried Chicken", 18000, 1, ChangeType::Add);
        assert_eq!(ledger.len(), 1);
        let update =
            ledger.update_quantity(&snap, "m1", "Fried Chicken", 18000, -1, ChangeType::Modify);

        assert_eq!(update.new_quantity, 2);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_decrement_clamps_at_zero() {
        let snap = snapshot();
        let mut ledger = PendingChangeLedger::new();

        let update = ledger.update_quantity(&snap, "m2", "Cola", 3000, -5, ChangeType::Modify);

        assert_eq!(update.new_quantity, 0);
        assert!(update.removed_line());
        assert_eq!(ledger.get("Cola").unwrap().original_quantity, 1);

        // removing a brand-new item entirely leaves nothing behind
        ledger.update_quantity(&snap, "m9", "Beer", 5000, 1, ChangeType::Add);
        ledger.update_quantity(&snap, "m9", "Beer", 5000, -3, ChangeType::Modify);
        assert!(!ledger.contains("Beer"));
    }

    #[test]
    fn test_random_sequences_match_clamped_sum() {
        let snap = snapshot();
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..500 {
            let mut ledger = PendingChangeLedger::new();
            let (name, id, original) = if rng.gen_bool(0.5) {
                ("Fried Chicken", "m1", 2i64)
            } else {
                ("Tea", "m3", 0i64)
            };

            // the final value equals the sum clamped at 0 only when every step
            // stays non-negative; track the clamped walk step by step
            let mut expected = original;
            for _ in 0..rng.gen_range(1..20) {
                let delta = rng.gen_range(-3..=3);
                ledger.update_quantity(&snap, id, name, 100, delta, ChangeType::Modify);
                expected = (expected + delta).max(0);

                // invariant after every mutation
                for change in ledger.iter() {
                    assert_ne!(change.new_quantity, change.original_quantity);
                }
                assert_eq!(
                    i64::from(ledger.effective_quantity(&snap, name)),
                    expected
                );
            }
        }
    }

    #[test]
    fn test_non_negative_sequence_equals_plain_sum() {
        let snap = snapshot();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let mut ledger = PendingChangeLedger::new();
            let deltas: Vec<i64> = (0..rng.gen_range(1..15)).map(|_| rng.gen_range(0..4)).collect();
            for delta in &deltas {
                ledger.update_quantity(&snap, "m1", "Fried Chicken", 18000, *delta, ChangeType::Add);
            }
            let expected = (2 + deltas.iter().sum::<i64>()).max(0) as u32;
            assert_eq!(ledger.effective_quantity(&snap, "Fried Chicken"), expected);
            assert_eq!(ledger.contains("Fried Chicken"), expected != 2);
        }
    }

    #[test]
    fn test_rebase_keeps_requested_delta() {
        let snap = snapshot();
        let mut ledger = PendingChangeLedger::new();
        ledger.update_quantity(&snap, "m1", "Fried Chicken", 18000, 1, ChangeType::Add);
        ledger.update_quantity(&snap, "m2", "Cola", 3000, -1, ChangeType::Modify);
        assert_eq!(generate_diff(&ledger).removals.get("Cola"), Some(&1));

        // another terminal raised both lines in the meantime
        let refreshed = SnapshotStore::from_lines([
            OrderLine::new("m1", "Fried Chicken", 18000, 3),
            OrderLine::new("m2", "Cola", 3000, 3),
        ]);
        ledger.rebase(&refreshed);

        let chicken = ledger.get("Fried Chicken").unwrap();
        assert_eq!((chicken.original_quantity, chicken.new_quantity), (3, 4));
        let cola = ledger.get("Cola").unwrap();
        assert_eq!((cola.original_quantity, cola.new_quantity), (3, 2));

        let diff = generate_diff(&ledger);
        assert_eq!(diff.additions.get("Fried Chicken"), Some(&1));
        assert_eq!(diff.removals.get("Cola"), Some(&1));
    }

    #[test]
    fn test_rebase_drops_clamped_removal() {
        let snap = snapshot();
        let mut ledger = PendingChangeLedger::new();
        ledger.update_quantity(&snap, "m2", "Cola", 3000, -1, ChangeType::Modify);

        // the line is already gone from the committed order
        ledger.rebase(&SnapshotStore::from_lines([OrderLine::new(
            "m1",
            "Fried Chicken",
            18000,
            2,
        )]));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_restore_saved_change() {
        let snap = snapshot();
        let mut ledger = PendingChangeLedger::new();
        let saved = SavedChange {
            menu_id: "m2".into(),
            menu_name: "Cola".into(),
            price: 3000,
            original_quantity: 1,
            new_quantity: 4,
            change_type: ChangeType::Add,
        };
        assert!(ledger.restore(&snap, &saved));
        assert_eq!(ledger.effective_quantity(&snap, "Cola"), 4);

        // removal of a line that is no longer on the order
        let noop = SavedChange {
            menu_id: "m9".into(),
            menu_name: "Soup".into(),
            price: 1500,
            original_quantity: 1,
            new_quantity: 0,
            change_type: ChangeType::Modify,
        };
        assert!(!ledger.restore(&snap, &noop));
        assert_eq!(ledger.to_saved().len(), 1);
    }
}
