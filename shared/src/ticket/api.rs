//! Batch-modify payloads exchanged with the backend-of-record

use super::line::OrderLine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Diff submitted on confirm: quantities to add and to remove per menu name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BatchModifyRequest {
    #[serde(default)]
    pub additions: BTreeMap<String, u32>,
    #[serde(default)]
    pub removals: BTreeMap<String, u32>,
}

impl BatchModifyRequest {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    /// Number of distinct lines touched by the diff
    pub fn line_count(&self) -> usize {
        self.additions.len()
            + self
                .removals
                .keys()
                .filter(|name| !self.additions.contains_key(*name))
                .count()
    }
}

/// Backend answer to a batch modification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BatchModifyResponse {
    pub success: bool,
    #[serde(default)]
    pub updated_lines: Vec<OrderLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
