//! Order records per ordering channel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 下单渠道
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSource {
    /// Entered on a staff terminal
    Terminal,
    /// Placed by the customer through the external ordering app
    ExternalApp,
}

/// One item of a source order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_id: Option<String>,
    pub quantity: u32,
    pub unit_price: i64,
}

/// One order placed through one channel for a table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceOrderRecord {
    /// Backend reference of this order
    pub order_id: String,
    pub source: OrderSource,
    /// Items keyed by menu name
    pub items: BTreeMap<String, SourceItem>,
    pub created_at: DateTime<Utc>,
}

/// A consolidated line across one or more source orders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsolidatedLine {
    pub menu_name: String,
    pub price: i64,
    pub quantity: u32,
    /// Set only when the view is tagged by source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<OrderSource>,
    /// First menu id reported for this group, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_id: Option<String>,
    /// Backend orders contributing to this line
    #[serde(default)]
    pub order_ids: Vec<String>,
}

impl ConsolidatedLine {
    pub fn line_total(&self) -> i64 {
        self.price * i64::from(self.quantity)
    }
}
