//! Order / Decision Reconciliation
//!
//! Cross-checks what the trading agent says it did against what the exchange
//! actually executed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐          ┌──────────────────────────┐
//! │ orders_export.json   │          │ decision_*.json          │
//! └──────────┬───────────┘          └────────────┬─────────────┘
//!            ▼                                   ▼
//! ┌──────────────────────┐          ┌──────────────────────────┐
//! │ OrderLedger          │          │ extract_events           │
//! │ (coerce, drop bad)   │          │ structured + exec log    │
//! └──────────┬───────────┘          │ (dedup within 600s)      │
//!            │                      └────────────┬─────────────┘
//!            └──────────────┬────────────────────┘
//!                           ▼
//!                 ┌───────────────────┐
//!                 │ Matcher           │  order_id, else nearest
//!                 │                   │  FILLED within ±window
//!                 └─────────┬─────────┘
//!                           ▼
//!                 ┌───────────────────┐
//!                 │ Validator         │  price / qty tolerance,
//!                 │                   │  strict vs lenient
//!                 └─────────┬─────────┘
//!                           ▼
//!                 ┌───────────────────┐
//!                 │ ReconcileReport   │  CSV + Markdown + JSON
//!                 └───────────────────┘
//! ```
//!
//! # Modes
//!
//! - **Lenient**: time-window fallback allowed, missing price/quantity is not
//!   a failure
//! - **Strict**: identifier matches only, price and quantity must be present
//!   and within tolerance, position side and reduce-only must agree

pub mod clock;
pub mod config;
pub mod decisions;
pub mod engine;
pub mod error;
pub mod execution_log;
pub mod ledger;
pub mod matching;
pub mod normalize;
pub mod report;
pub mod sources;
pub mod timezh;
pub mod validation;

#[cfg(test)]
mod matching_tests;

pub use config::{ReconcileConfig, ReconcileMode, TimeRange};
pub use decisions::{
    extract_events, DecisionAction, DecisionDocument, DecisionEvent, EventExtractor, EventSource,
    ExtractionStats, OrderExpectation, StructuredExtractor,
};
pub use engine::{reconcile, reconcile_raw};
pub use error::ReconcileError;
pub use execution_log::ExecutionLogExtractor;
pub use ledger::{LedgerLoadStats, OrderLedger, OrderRecord, OrderSide, PositionSide};
pub use matching::{MatchMethod, MatchOutcome, Matcher};
pub use report::{ReconcileReport, ReconcileSummary, ReportContext, ReportRow};
pub use sources::{load_decision_documents, load_order_values};
pub use timezh::add_timezh;
pub use validation::{within_pct, Validation, Validator, Verdict};
