//! Order Snapshot Store
//!
//! Last known committed state of a table's order lines. It is the source of
//! truth for original quantities until the next successful confirm, when it is
//! replaced by merging the confirmed pending changes.

use shared::ticket::{OrderLine, PendingChange};

/// Committed order lines of one table, in backend order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotStore {
    lines: Vec<OrderLine>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from backend lines
    ///
    /// Lines sharing a `menu_name` are one logical item: their quantities are
    /// summed and ticket references united, the first line's price is kept.
    pub fn from_lines(lines: impl IntoIterator<Item = OrderLine>) -> Self {
        let mut store = Self::new();
        store.replace(lines);
        store
    }

    /// Replace the whole snapshot
    pub fn replace(&mut self, lines: impl IntoIterator<Item = OrderLine>) {
        self.lines.clear();
        for line in lines {
            match self.position(&line.menu_name) {
                Some(idx) => {
                    let existing = &mut self.lines[idx];
                    if existing.price != line.price {
                        tracing::warn!(
                            menu_name = %line.menu_name,
                            kept_price = existing.price,
                            dropped_price = line.price,
                            "Duplicate order line with diverging price"
                        );
                    }
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                    existing.source_ticket_ids.extend(line.source_ticket_ids);
                }
                None => self.lines.push(line),
            }
        }
    }

    fn position(&self, menu_name: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.menu_name == menu_name)
    }

    pub fn get(&self, menu_name: &str) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.menu_name == menu_name)
    }

    pub fn contains(&self, menu_name: &str) -> bool {
        self.position(menu_name).is_some()
    }

    /// Committed quantity (0 when the line does not exist yet)
    pub fn quantity_of(&self, menu_name: &str) -> u32 {
        self.get(menu_name).map(|l| l.quantity).unwrap_or(0)
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of quantity × price over all lines
    pub fn total(&self) -> i64 {
        self.lines.iter().map(OrderLine::line_total).sum()
    }

    /// Merge confirmed changes into the snapshot
    ///
    /// New lines are appended, existing quantities replaced, and lines whose
    /// new quantity is 0 removed. Returns the number of lines touched.
    pub fn apply_changes<'a>(&mut self, changes: impl IntoIterator<Item = &'a PendingChange>) -> usize {
        let mut changed = 0;
        for change in changes {
            match self.position(&change.menu_name) {
                Some(idx) if change.new_quantity == 0 => {
                    self.lines.remove(idx);
                }
                Some(idx) => {
                    self.lines[idx].quantity = change.new_quantity;
                }
                None if change.new_quantity == 0 => continue,
                None => {
                    self.lines.push(OrderLine::new(
                        change.menu_id.clone(),
                        change.menu_name.clone(),
                        change.price,
                        change.new_quantity,
                    ));
                }
            }
            changed += 1;
        }
        changed
    }
}
