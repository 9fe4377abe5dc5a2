//! Matcher Tests
//!
//! Identifier precedence, time-window eligibility and tie-breaking.

use crate::reconcile::config::ReconcileMode;
use crate::reconcile::decisions::{DecisionAction, DecisionEvent, EventSource};
use crate::reconcile::ledger::{OrderLedger, OrderRecord, OrderSide, PositionSide};
use crate::reconcile::matching::{MatchMethod, Matcher};
use chrono::{DateTime, Duration, TimeZone, Utc};

// =============================================================================
// TEST HELPERS
// =============================================================================

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 10, 12, 0, 0).unwrap()
}

fn filled(order_id: u64, offset_secs: i64, side: OrderSide, position_side: Option<PositionSide>) -> OrderRecord {
    OrderRecord {
        time: t0() + Duration::seconds(offset_secs),
        order_id,
        symbol: "BTCUSDT".into(),
        side: Some(side),
        position_side,
        reduce_only: None,
        status: "FILLED".into(),
        order_type: "MARKET".into(),
        avg_price: Some(100_000.0),
        executed_qty: Some(0.01),
    }
}

fn decision(action: DecisionAction, order_id: Option<u64>) -> DecisionEvent {
    DecisionEvent {
        timestamp: t0(),
        symbol: "BTCUSDT".into(),
        action,
        price: Some(100_000.0),
        quantity: Some(0.01),
        order_id,
        success: true,
        source: EventSource::Structured,
        document: "decision_test.json".into(),
    }
}

// =============================================================================
// IDENTIFIER MATCHING
// =============================================================================

#[test]
fn test_identifier_takes_precedence_over_closer_candidate() {
    let ledger = OrderLedger::new(vec![
        filled(7, 1, OrderSide::Buy, Some(PositionSide::Long)),
        filled(42, 170, OrderSide::Buy, Some(PositionSide::Long)),
    ]);
    let matcher = Matcher::new(&ledger, 180, ReconcileMode::Lenient);

    let outcome = matcher.match_event(&decision(DecisionAction::OpenLong, Some(42)));
    assert_eq!(outcome.method, MatchMethod::ByIdentifier);
    assert_eq!(outcome.order.unwrap().order_id, 42);
}

#[test]
fn test_identifier_match_ignores_filters() {
    // wrong side, not filled, far away: identifier still wins
    let mut order = filled(42, 86_400, OrderSide::Sell, Some(PositionSide::Short));
    order.status = "NEW".into();
    let ledger = OrderLedger::new(vec![order]);

    for mode in [ReconcileMode::Lenient, ReconcileMode::Strict] {
        let matcher = Matcher::new(&ledger, 180, mode);
        let outcome = matcher.match_event(&decision(DecisionAction::OpenLong, Some(42)));
        assert_eq!(outcome.method, MatchMethod::ByIdentifier);
    }
}

#[test]
fn test_unknown_identifier_falls_back_in_lenient_only() {
    let ledger = OrderLedger::new(vec![filled(7, 10, OrderSide::Buy, Some(PositionSide::Long))]);
    let event = decision(DecisionAction::OpenLong, Some(999));

    let lenient = Matcher::new(&ledger, 180, ReconcileMode::Lenient).match_event(&event);
    assert_eq!(lenient.method, MatchMethod::ByTimeWindow);
    assert_eq!(lenient.order.unwrap().order_id, 7);

    let strict = Matcher::new(&ledger, 180, ReconcileMode::Strict).match_event(&event);
    assert_eq!(strict.method, MatchMethod::Unmatched);
    assert!(!strict.is_matched());
}

// =============================================================================
// TIME WINDOW
// =============================================================================

#[test]
fn test_time_window_excludes_unfilled() {
    let mut new_order = filled(1, 5, OrderSide::Buy, Some(PositionSide::Long));
    new_order.status = "NEW".into();
    let ledger = OrderLedger::new(vec![new_order]);

    let outcome = Matcher::new(&ledger, 180, ReconcileMode::Lenient)
        .match_event(&decision(DecisionAction::OpenLong, None));
    assert_eq!(outcome.method, MatchMethod::Unmatched);
}

#[test]
fn test_time_window_filters() {
    let mut other_symbol = filled(1, 1, OrderSide::Buy, Some(PositionSide::Long));
    other_symbol.symbol = "ETHUSDT".into();
    let wrong_side = filled(2, 1, OrderSide::Sell, Some(PositionSide::Long));
    let wrong_position = filled(3, 1, OrderSide::Buy, Some(PositionSide::Short));
    let too_late = filled(4, 181, OrderSide::Buy, Some(PositionSide::Long));
    let ledger = OrderLedger::new(vec![other_symbol, wrong_side, wrong_position, too_late]);

    let outcome = Matcher::new(&ledger, 180, ReconcileMode::Lenient)
        .match_event(&decision(DecisionAction::OpenLong, None));
    assert_eq!(outcome.method, MatchMethod::Unmatched);
}

#[test]
fn test_time_window_bounds_inclusive() {
    let ledger = OrderLedger::new(vec![filled(1, -180, OrderSide::Buy, Some(PositionSide::Long))]);
    let outcome = Matcher::new(&ledger, 180, ReconcileMode::Lenient)
        .match_event(&decision(DecisionAction::OpenLong, None));
    assert_eq!(outcome.order.map(|o| o.order_id), Some(1));
}

#[test]
fn test_missing_position_side_is_not_excluded() {
    let ledger = OrderLedger::new(vec![filled(1, 30, OrderSide::Sell, None)]);
    let outcome = Matcher::new(&ledger, 180, ReconcileMode::Lenient)
        .match_event(&decision(DecisionAction::CloseLong, None));
    assert_eq!(outcome.order.map(|o| o.order_id), Some(1));
}

#[test]
fn test_nearest_candidate_wins() {
    let ledger = OrderLedger::new(vec![
        filled(1, -120, OrderSide::Buy, Some(PositionSide::Long)),
        filled(2, 45, OrderSide::Buy, Some(PositionSide::Long)),
        filled(3, -60, OrderSide::Buy, Some(PositionSide::Long)),
    ]);
    let outcome = Matcher::new(&ledger, 180, ReconcileMode::Lenient)
        .match_event(&decision(DecisionAction::OpenLong, None));
    assert_eq!(outcome.order.map(|o| o.order_id), Some(2));
}

#[test]
fn test_equidistant_tie_is_stable() {
    let ledger = OrderLedger::new(vec![
        filled(10, 30, OrderSide::Buy, Some(PositionSide::Long)),
        filled(11, -30, OrderSide::Buy, Some(PositionSide::Long)),
    ]);
    let event = decision(DecisionAction::OpenLong, None);

    for _ in 0..10 {
        let outcome = Matcher::new(&ledger, 180, ReconcileMode::Lenient).match_event(&event);
        assert_eq!(outcome.order.map(|o| o.order_id), Some(10));
    }
}

#[test]
fn test_reduce_only_mismatch_tolerated_unless_excluded() {
    let mut order = filled(1, 10, OrderSide::Sell, Some(PositionSide::Long));
    order.reduce_only = Some(false);
    let ledger = OrderLedger::new(vec![order]);
    let event = decision(DecisionAction::CloseLong, None);

    let tolerated = Matcher::new(&ledger, 180, ReconcileMode::Lenient).match_event(&event);
    assert_eq!(tolerated.method, MatchMethod::ByTimeWindow);

    let excluded = Matcher::new(&ledger, 180, ReconcileMode::Lenient)
        .with_reduce_only_exclusion(true)
        .match_event(&event);
    assert_eq!(excluded.method, MatchMethod::Unmatched);
}

#[test]
fn test_action_table() {
    let cases = [
        (DecisionAction::OpenLong, OrderSide::Buy, PositionSide::Long, false),
        (DecisionAction::OpenShort, OrderSide::Sell, PositionSide::Short, false),
        (DecisionAction::CloseLong, OrderSide::Sell, PositionSide::Long, true),
        (DecisionAction::CloseShort, OrderSide::Buy, PositionSide::Short, true),
    ];
    for (action, side, position_side, reduce_only) in cases {
        let e = action.expectation();
        assert_eq!(e.side, side, "{}", action);
        assert_eq!(e.position_side, position_side, "{}", action);
        assert_eq!(e.reduce_only, reduce_only, "{}", action);
    }
}
