//! Cross-Source Consolidator
//!
//! Merges the line items of every active source order of a table (staff
//! terminal and external ordering app) into one view.
//!
//! - single effective source: grouped by `(menu_name, price)`
//! - mixed order: grouped by `(menu_name, price, source)` with per-source
//!   subtotals, so a mixed ticket can show "External: X, Terminal: Y, Total"
//!
//! The result is sorted by group key and never depends on the order of the
//! input records.

use shared::ticket::{ConsolidatedLine, OrderLine, OrderSource, SourceOrderRecord};
use std::collections::{BTreeMap, BTreeSet};

/// Consolidated view of a table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Consolidation {
    pub lines: Vec<ConsolidatedLine>,
    /// Σ quantity × price per source (only filled when tagged by source)
    pub source_subtotals: BTreeMap<OrderSource, i64>,
    pub total: i64,
    pub tagged_by_type: bool,
}

impl Consolidation {
    pub fn subtotal(&self, source: OrderSource) -> i64 {
        self.source_subtotals.get(&source).copied().unwrap_or(0)
    }
}

type GroupKey = (String, i64, Option<OrderSource>);

#[derive(Default)]
struct Group {
    quantity: u32,
    menu_ids: BTreeSet<String>,
    order_ids: BTreeSet<String>,
}

/// Group and sum the items of all source orders
pub fn consolidate(records: &[SourceOrderRecord], tagged_by_type: bool) -> Consolidation {
    let mut groups: BTreeMap<GroupKey, Group> = BTreeMap::new();

    for record in records {
        for (name, item) in &record.items {
            let key = (
                name.clone(),
                item.unit_price,
                tagged_by_type.then_some(record.source),
            );
            let group = groups.entry(key).or_default();
            group.quantity = group.quantity.saturating_add(item.quantity);
            if let Some(menu_id) = &item.menu_id {
                group.menu_ids.insert(menu_id.clone());
            }
            group.order_ids.insert(record.order_id.clone());
        }
    }

    let mut result = Consolidation {
        tagged_by_type,
        ..Default::default()
    };
    for ((menu_name, price, source), group) in groups {
        if group.quantity == 0 {
            continue;
        }
        let line = ConsolidatedLine {
            menu_name,
            price,
            quantity: group.quantity,
            source,
            // smallest id keeps the choice independent of input order
            menu_id: group.menu_ids.into_iter().next(),
            order_ids: group.order_ids.into_iter().collect(),
        };
        if let Some(source) = source {
            *result.source_subtotals.entry(source).or_insert(0) += line.line_total();
        }
        result.total += line.line_total();
        result.lines.push(line);
    }
    result
}

/// At least one terminal and one external-app record, or flagged by the backend
pub fn is_mixed_order(records: &[SourceOrderRecord], backend_flag: bool) -> bool {
    if backend_flag {
        return true;
    }
    let has = |source: OrderSource| records.iter().any(|r| r.source == source);
    has(OrderSource::Terminal) && has(OrderSource::ExternalApp)
}

/// Consolidate with the grouping that fits the table
pub fn consolidate_for_table(records: &[SourceOrderRecord], backend_flag: bool) -> Consolidation {
    consolidate(records, is_mixed_order(records, backend_flag))
}

/// Committed order lines for the Snapshot Store
///
/// Lines are keyed by name only: groups of the same name with different prices
/// collapse into one line carrying the first (lowest) price.
pub fn to_order_lines(consolidation: &Consolidation) -> Vec<OrderLine> {
    let mut lines: Vec<OrderLine> = Vec::new();
    for group in &consolidation.lines {
        match lines.iter_mut().find(|l| l.menu_name == group.menu_name) {
            Some(existing) => {
                if existing.price != group.price {
                    tracing::warn!(
                        menu_name = %group.menu_name,
                        kept_price = existing.price,
                        other_price = group.price,
                        "Same menu line with different prices across sources"
                    );
                }
                existing.quantity = existing.quantity.saturating_add(group.quantity);
                existing.source_ticket_ids.extend(group.order_ids.iter().cloned());
            }
            None => {
                let mut line = OrderLine::new(
                    group
                        .menu_id
                        .clone()
                        .unwrap_or_else(|| group.menu_name.clone()),
                    group.menu_name.clone(),
                    group.price,
                    group.quantity,
                );
                line.source_ticket_ids = group.order_ids.iter().cloned().collect();
                lines.push(line);
            }
        }
    }
    lines
}
