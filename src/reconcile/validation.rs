//! Price / Quantity Validation
//!
//! Compares what a decision claims against what the matched order executed.

use crate::reconcile::config::ReconcileMode;
use crate::reconcile::decisions::DecisionEvent;
use crate::reconcile::ledger::OrderRecord;
use serde::{Deserialize, Serialize};

/// Relative differences are measured against at least this magnitude.
const MIN_DENOMINATOR: f64 = 1e-12;

/// Three-valued comparison verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    /// One side of the comparison is missing
    NotApplicable,
}

impl Verdict {
    /// Report code: OK / NG / NA.
    pub fn code(&self) -> &'static str {
        match self {
            Verdict::Pass => "OK",
            Verdict::Fail => "NG",
            Verdict::NotApplicable => "NA",
        }
    }

    pub fn is_fail(self) -> bool {
        matches!(self, Verdict::Fail)
    }

    /// Whether this verdict lets an event pass under `mode`.
    pub fn acceptable(self, mode: ReconcileMode) -> bool {
        match (self, mode) {
            (Verdict::Pass, _) => true,
            (Verdict::NotApplicable, ReconcileMode::Lenient) => true,
            (Verdict::NotApplicable, ReconcileMode::Strict) => false,
            (Verdict::Fail, _) => false,
        }
    }
}

impl From<bool> for Verdict {
    fn from(ok: bool) -> Self {
        if ok {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }
}

/// Relative tolerance check of `claimed` against `actual`.
pub fn within_pct(claimed: Option<f64>, actual: Option<f64>, tol_pct: f64) -> Verdict {
    let (Some(claimed), Some(actual)) = (claimed, actual) else {
        return Verdict::NotApplicable;
    };
    if claimed == 0.0 && actual == 0.0 {
        return Verdict::Pass;
    }
    if claimed == 0.0 || actual == 0.0 {
        return Verdict::Fail;
    }
    Verdict::from((claimed - actual).abs() / actual.abs().max(MIN_DENOMINATOR) <= tol_pct / 100.0)
}

/// Percentage difference, when both sides are known and `actual` is non-zero.
pub fn diff_pct(claimed: Option<f64>, actual: Option<f64>) -> Option<f64> {
    match (claimed, actual) {
        (Some(c), Some(a)) if a != 0.0 => Some((c - a).abs() / a.abs() * 100.0),
        _ => None,
    }
}

/// Validation of one matched event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    pub price: Verdict,
    pub quantity: Verdict,
    pub price_diff_pct: Option<f64>,
    pub qty_diff_pct: Option<f64>,
    /// Strict mode only: position side or reduce-only contradicts the action
    pub direction_mismatch: bool,
    pub passed: bool,
}

/// Tolerances and mode applied to every matched event.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    pub price_tolerance_pct: f64,
    pub qty_tolerance_pct: f64,
    pub mode: ReconcileMode,
}

impl Validator {
    pub fn new(price_tolerance_pct: f64, qty_tolerance_pct: f64, mode: ReconcileMode) -> Self {
        Self {
            price_tolerance_pct,
            qty_tolerance_pct,
            mode,
        }
    }

    pub fn validate(&self, event: &DecisionEvent, order: &OrderRecord) -> Validation {
        let price = within_pct(event.price, order.avg_price, self.price_tolerance_pct);
        let mut quantity = within_pct(event.quantity, order.executed_qty, self.qty_tolerance_pct);

        let mut direction_mismatch = false;
        if self.mode.is_strict() {
            let expected = event.action.expectation();
            let position_wrong = order
                .position_side
                .is_some_and(|ps| ps != expected.position_side);
            let reduce_wrong = order
                .reduce_only
                .is_some_and(|ro| ro != expected.reduce_only);
            if position_wrong || reduce_wrong {
                direction_mismatch = true;
                quantity = Verdict::Fail;
            }
        }

        Validation {
            price,
            quantity,
            price_diff_pct: diff_pct(event.price, order.avg_price),
            qty_diff_pct: diff_pct(event.quantity, order.executed_qty),
            direction_mismatch,
            passed: price.acceptable(self.mode) && quantity.acceptable(self.mode),
        }
    }
}
