//! Confirm-time diff generation
//!
//! Pure function over the ledger: each pending change contributes its net
//! delta to either `additions` or `removals`.

use super::ledger::PendingChangeLedger;
use shared::ticket::{BatchModifyRequest, PendingChange};

/// Build the batch-modify diff for the whole ledger
pub fn generate_diff(ledger: &PendingChangeLedger) -> BatchModifyRequest {
    diff_changes(ledger.iter())
}

/// Build a diff from any set of pending changes
pub fn diff_changes<'a>(changes: impl IntoIterator<Item = &'a PendingChange>) -> BatchModifyRequest {
    let mut request = BatchModifyRequest::default();
    for change in changes {
        let diff = change.net_delta();
        if diff > 0 {
            *request
                .additions
                .entry(change.menu_name.clone())
                .or_insert(0) += diff as u32;
        } else if diff < 0 {
            *request
                .removals
                .entry(change.menu_name.clone())
                .or_insert(0) += diff.unsigned_abs() as u32;
        }
    }
    request
}
