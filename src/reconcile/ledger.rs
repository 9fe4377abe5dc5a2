//! Order Ledger
//!
//! Normalized table of executed exchange orders. This is ground truth for the
//! reconciliation: decision events are judged against it, never the reverse.
//!
//! # Loading Rules
//!
//! - `orderId` and `symbol` are required; records without them are dropped
//! - every other field is optional and blanks independently on bad input
//! - epoch time comes from `time`, falling back to `updateTime`, in any unit
//!   from seconds to nanoseconds

use crate::reconcile::clock::epoch_to_datetime;
use crate::reconcile::normalize::{
    coerce_bool, coerce_i64, coerce_id, coerce_non_negative, coerce_str, field,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Exchange order identifier.
pub type OrderId = u64;

/// Status string that makes an order eligible for time-window matching.
pub const STATUS_FILLED: &str = "FILLED";

// =============================================================================
// ENUMS
// =============================================================================

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Some(OrderSide::Buy),
            "SELL" => Some(OrderSide::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Futures position side. `Both` is what one-way (non-hedge) accounts report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
    Both,
}

impl PositionSide {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LONG" => Some(PositionSide::Long),
            "SHORT" => Some(PositionSide::Short),
            "BOTH" => Some(PositionSide::Both),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
            PositionSide::Both => "BOTH",
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ORDER RECORD
// =============================================================================

/// One normalized exchange order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Order time, normalized to whole seconds
    pub time: DateTime<Utc>,
    pub order_id: OrderId,
    pub symbol: String,
    pub side: Option<OrderSide>,
    pub position_side: Option<PositionSide>,
    /// Tri-state: exchanges sometimes omit it
    pub reduce_only: Option<bool>,
    pub status: String,
    pub order_type: String,
    pub avg_price: Option<f64>,
    pub executed_qty: Option<f64>,
}

impl OrderRecord {
    /// Normalize one loosely-typed record. Returns `None` when a required
    /// field (`orderId`, `symbol`) is missing or uncoercible.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let order_id = field(obj, "orderId", coerce_id)?;
        let symbol = field(obj, "symbol", coerce_str)?.to_string();

        let raw_time = field(obj, "time", coerce_i64).or_else(|| field(obj, "updateTime", coerce_i64));
        let time = raw_time
            .and_then(epoch_to_datetime)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Some(Self {
            time,
            order_id,
            symbol,
            side: field(obj, "side", Value::as_str).and_then(OrderSide::parse),
            position_side: field(obj, "positionSide", Value::as_str).and_then(PositionSide::parse),
            reduce_only: field(obj, "reduceOnly", coerce_bool),
            status: field(obj, "status", Value::as_str).unwrap_or_default().to_string(),
            order_type: field(obj, "type", Value::as_str).unwrap_or_default().to_string(),
            avg_price: field(obj, "avgPrice", coerce_non_negative),
            executed_qty: field(obj, "executedQty", coerce_non_negative),
        })
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.status == STATUS_FILLED
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// Load statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLoadStats {
    pub total: usize,
    pub loaded: usize,
    pub dropped: usize,
}

/// Ordered order table with an identifier index.
#[derive(Debug, Clone, Default)]
pub struct OrderLedger {
    orders: Vec<OrderRecord>,
    by_id: HashMap<OrderId, usize>,
}

impl OrderLedger {
    /// Build from already-normalized records. A repeated identifier keeps
    /// every record in sequence; the index points at the last one.
    pub fn new(orders: Vec<OrderRecord>) -> Self {
        let by_id = orders
            .iter()
            .enumerate()
            .map(|(idx, o)| (o.order_id, idx))
            .collect();
        Self { orders, by_id }
    }

    /// Normalize a batch of raw records, dropping the ones that fail.
    pub fn from_values(values: &[Value]) -> (Self, LedgerLoadStats) {
        let mut orders = Vec::with_capacity(values.len());
        for (idx, value) in values.iter().enumerate() {
            match OrderRecord::from_value(value) {
                Some(order) => orders.push(order),
                None => debug!(index = idx, "dropping order record without usable orderId/symbol"),
            }
        }

        let stats = LedgerLoadStats {
            total: values.len(),
            loaded: orders.len(),
            dropped: values.len() - orders.len(),
        };
        if stats.dropped > 0 {
            warn!(
                dropped = stats.dropped,
                total = stats.total,
                "dropped malformed order records"
            );
        }

        let ledger = Self::new(orders);
        if ledger.by_id.len() < ledger.orders.len() {
            warn!(
                duplicates = ledger.orders.len() - ledger.by_id.len(),
                "order ledger repeats identifiers; last occurrence wins on lookup"
            );
        }
        (ledger, stats)
    }

    pub fn get(&self, order_id: OrderId) -> Option<&OrderRecord> {
        self.by_id.get(&order_id).map(|&idx| &self.orders[idx])
    }

    pub fn orders(&self) -> &[OrderRecord] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
