//! Decision → Order Matching
//!
//! Associates each decision event with at most one exchange order.
//!
//! # Strategy
//!
//! 1. **Identifier**: the event's `order_id` is looked up in the ledger. Used
//!    in both modes and always wins when it hits.
//! 2. **Time window** (lenient only): nearest FILLED order with the same
//!    symbol and the side implied by the action, within ± tolerance.
//!
//! A reduce-only disagreement does not exclude a time-window candidate by
//! default; validation reports it instead.

use crate::reconcile::config::ReconcileMode;
use crate::reconcile::decisions::DecisionEvent;
use crate::reconcile::ledger::{OrderLedger, OrderRecord};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// How an event was associated with an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    ByIdentifier,
    ByTimeWindow,
    Unmatched,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::ByIdentifier => "by_identifier",
            MatchMethod::ByTimeWindow => "by_time_window",
            MatchMethod::Unmatched => "unmatched",
        }
    }
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of matching one event.
#[derive(Debug, Clone, Copy)]
pub struct MatchOutcome<'a> {
    pub method: MatchMethod,
    pub order: Option<&'a OrderRecord>,
}

impl<'a> MatchOutcome<'a> {
    pub fn unmatched() -> Self {
        Self {
            method: MatchMethod::Unmatched,
            order: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.order.is_some()
    }
}

/// Matches events against one ledger.
#[derive(Debug, Clone)]
pub struct Matcher<'a> {
    ledger: &'a OrderLedger,
    window: TimeDelta,
    mode: ReconcileMode,
    exclude_reduce_only_mismatch: bool,
}

impl<'a> Matcher<'a> {
    pub fn new(ledger: &'a OrderLedger, time_tolerance_secs: u64, mode: ReconcileMode) -> Self {
        let secs = i64::try_from(time_tolerance_secs).unwrap_or(i64::MAX);
        Self {
            ledger,
            window: TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX),
            mode,
            exclude_reduce_only_mismatch: false,
        }
    }

    /// Exclude time-window candidates whose reduce-only flag contradicts the
    /// action (both sides known).
    pub fn with_reduce_only_exclusion(mut self, exclude: bool) -> Self {
        self.exclude_reduce_only_mismatch = exclude;
        self
    }

    pub fn match_event(&self, event: &DecisionEvent) -> MatchOutcome<'a> {
        if let Some(order) = self.find_by_identifier(event) {
            return MatchOutcome {
                method: MatchMethod::ByIdentifier,
                order: Some(order),
            };
        }
        if self.mode.is_strict() {
            return MatchOutcome::unmatched();
        }
        match self.find_in_time_window(event) {
            Some(order) => MatchOutcome {
                method: MatchMethod::ByTimeWindow,
                order: Some(order),
            },
            None => MatchOutcome::unmatched(),
        }
    }

    pub fn find_by_identifier(&self, event: &DecisionEvent) -> Option<&'a OrderRecord> {
        event.order_id.and_then(|id| self.ledger.get(id))
    }

    /// Nearest eligible order in time; ties go to the earliest in ledger order.
    pub fn find_in_time_window(&self, event: &DecisionEvent) -> Option<&'a OrderRecord> {
        self.ledger
            .orders()
            .iter()
            .filter(|order| self.is_candidate(event, order))
            .min_by_key(|order| (order.time - event.timestamp).abs())
    }

    fn is_candidate(&self, event: &DecisionEvent, order: &OrderRecord) -> bool {
        let expected = event.action.expectation();

        if order.symbol != event.symbol || !order.is_filled() {
            return false;
        }
        if order.side != Some(expected.side) {
            return false;
        }
        if (order.time - event.timestamp).abs() > self.window {
            return false;
        }
        if order.position_side.is_some_and(|ps| ps != expected.position_side) {
            return false;
        }
        if self.exclude_reduce_only_mismatch
            && order.reduce_only.is_some_and(|ro| ro != expected.reduce_only)
        {
            return false;
        }
        true
    }
}
