//! Decision Events
//!
//! Normalized position-change claims made by the trading agent, extracted from
//! `decision_*.json` documents.
//!
//! # Extraction
//!
//! Each document is read in two passes:
//!
//! 1. **Structured**: the `decisions` array, one event per successful entry
//! 2. **Execution log**: free-text `execution_log` lines, used as a fallback
//!    for actions the structured list does not carry
//!
//! An execution-log hit is dropped when an event with the same symbol and
//! action already exists less than [`DEDUP_WINDOW_SECS`] from the document's
//! base time, so one real action reported both ways is counted once.

use crate::reconcile::clock::parse_timestamp;
use crate::reconcile::execution_log::ExecutionLogExtractor;
use crate::reconcile::ledger::{OrderId, OrderSide, PositionSide};
use crate::reconcile::normalize::{coerce_id, coerce_non_negative, coerce_str, field};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Fallback events closer than this to an existing event are duplicates.
pub const DEDUP_WINDOW_SECS: i64 = 600;

// =============================================================================
// ACTIONS
// =============================================================================

/// Position change claimed by a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DecisionAction {
    OpenLong = 0,
    OpenShort = 1,
    CloseLong = 2,
    CloseShort = 3,
}

/// Order shape that a decision action must produce on the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderExpectation {
    pub side: OrderSide,
    pub position_side: PositionSide,
    pub reduce_only: bool,
}

/// Indexed by `DecisionAction as usize`.
const EXPECTATIONS: [OrderExpectation; 4] = [
    // open_long
    OrderExpectation {
        side: OrderSide::Buy,
        position_side: PositionSide::Long,
        reduce_only: false,
    },
    // open_short
    OrderExpectation {
        side: OrderSide::Sell,
        position_side: PositionSide::Short,
        reduce_only: false,
    },
    // close_long
    OrderExpectation {
        side: OrderSide::Sell,
        position_side: PositionSide::Long,
        reduce_only: true,
    },
    // close_short
    OrderExpectation {
        side: OrderSide::Buy,
        position_side: PositionSide::Short,
        reduce_only: true,
    },
];

impl DecisionAction {
    pub const ALL: [DecisionAction; 4] = [
        DecisionAction::OpenLong,
        DecisionAction::OpenShort,
        DecisionAction::CloseLong,
        DecisionAction::CloseShort,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open_long" => Some(DecisionAction::OpenLong),
            "open_short" => Some(DecisionAction::OpenShort),
            "close_long" => Some(DecisionAction::CloseLong),
            "close_short" => Some(DecisionAction::CloseShort),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::OpenLong => "open_long",
            DecisionAction::OpenShort => "open_short",
            DecisionAction::CloseLong => "close_long",
            DecisionAction::CloseShort => "close_short",
        }
    }

    /// Expected side / position side / reduce-only flag of the exchange order.
    #[inline]
    pub fn expectation(self) -> OrderExpectation {
        EXPECTATIONS[self as usize]
    }
}

impl std::fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// Which pass produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Structured,
    ExecutionLog,
}

/// One successful position-change claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEvent {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub action: DecisionAction,
    pub price: Option<f64>,
    pub quantity: Option<f64>,
    pub order_id: Option<OrderId>,
    pub success: bool,
    pub source: EventSource,
    /// Document the event was read from
    pub document: String,
}

/// One decision log document as loaded from storage.
#[derive(Debug, Clone)]
pub struct DecisionDocument {
    /// File name; documents are processed in lexicographic name order
    pub name: String,
    /// Last-modified time, the fallback base timestamp
    pub modified: Option<DateTime<Utc>>,
    pub body: Value,
}

impl DecisionDocument {
    /// Declared `timestamp`, else the last-modified time.
    pub fn base_timestamp(&self) -> Option<DateTime<Utc>> {
        self.body
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .or(self.modified)
    }
}

/// Turns one document into candidate events. Implementations are pure.
pub trait EventExtractor {
    fn extract(&self, doc: &DecisionDocument, base_ts: DateTime<Utc>) -> Vec<DecisionEvent>;
}

// =============================================================================
// STRUCTURED PASS
// =============================================================================

/// Reads the `decisions` array.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredExtractor;

impl StructuredExtractor {
    fn parse_entry(entry: &Value, doc: &DecisionDocument, base_ts: DateTime<Utc>) -> Option<DecisionEvent> {
        let obj = entry.as_object()?;

        let action = field(obj, "action", Value::as_str).and_then(DecisionAction::parse)?;
        let symbol = field(obj, "symbol", coerce_str)?.to_string();
        if obj.get("success").and_then(Value::as_bool) != Some(true) {
            return None;
        }

        let timestamp = field(obj, "timestamp", Value::as_str)
            .and_then(parse_timestamp)
            .unwrap_or(base_ts);

        Some(DecisionEvent {
            timestamp,
            symbol,
            action,
            price: field(obj, "price", coerce_non_negative),
            quantity: field(obj, "quantity", coerce_non_negative),
            order_id: field(obj, "order_id", coerce_id),
            success: true,
            source: EventSource::Structured,
            document: doc.name.clone(),
        })
    }
}

impl EventExtractor for StructuredExtractor {
    fn extract(&self, doc: &DecisionDocument, base_ts: DateTime<Utc>) -> Vec<DecisionEvent> {
        let Some(entries) = doc.body.get("decisions").and_then(Value::as_array) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|entry| Self::parse_entry(entry, doc, base_ts))
            .collect()
    }
}

// =============================================================================
// DOCUMENT SCAN
// =============================================================================

/// Extraction statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub documents_scanned: usize,
    pub documents_skipped: usize,
    pub structured_events: usize,
    pub execution_log_events: usize,
    pub duplicates_suppressed: usize,
}

fn is_duplicate(existing: &[DecisionEvent], candidate: &DecisionEvent, base_ts: DateTime<Utc>) -> bool {
    existing.iter().any(|e| {
        e.symbol == candidate.symbol
            && e.action == candidate.action
            && (e.timestamp - base_ts).num_seconds().abs() < DEDUP_WINDOW_SECS
    })
}

/// Extract successful decision events from a document collection.
pub fn extract_events(documents: &[DecisionDocument]) -> (Vec<DecisionEvent>, ExtractionStats) {
    let mut ordered: Vec<&DecisionDocument> = documents.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));

    let structured = StructuredExtractor;
    let fallback = ExecutionLogExtractor::new();

    let mut events: Vec<DecisionEvent> = Vec::new();
    let mut stats = ExtractionStats::default();

    for doc in ordered {
        let Some(base_ts) = doc.base_timestamp() else {
            warn!(document = %doc.name, "decision document has no usable timestamp, skipping");
            stats.documents_skipped += 1;
            continue;
        };
        stats.documents_scanned += 1;

        let found = structured.extract(doc, base_ts);
        stats.structured_events += found.len();
        events.extend(found);

        for candidate in fallback.extract(doc, base_ts) {
            if is_duplicate(&events, &candidate, base_ts) {
                debug!(
                    document = %doc.name,
                    symbol = %candidate.symbol,
                    action = %candidate.action,
                    "execution log line duplicates an extracted decision"
                );
                stats.duplicates_suppressed += 1;
                continue;
            }
            stats.execution_log_events += 1;
            events.push(candidate);
        }
    }

    (events, stats)
}
