//! Reconciliation Run
//!
//! Wires the stages together: time filter → match → validate → report.
//! Pure over its inputs; the same ledger, events and config always give the
//! same report.

use crate::reconcile::config::ReconcileConfig;
use crate::reconcile::decisions::{extract_events, DecisionDocument, DecisionEvent};
use crate::reconcile::ledger::OrderLedger;
use crate::reconcile::matching::Matcher;
use crate::reconcile::report::{ReconcileReport, ReportBuilder};
use crate::reconcile::validation::Validator;
use serde_json::Value;
use tracing::{debug, info};

/// Match and validate `events` against `ledger`.
pub fn reconcile(
    ledger: &OrderLedger,
    events: &[DecisionEvent],
    config: &ReconcileConfig,
) -> ReconcileReport {
    let matcher = Matcher::new(ledger, config.time_tolerance_secs, config.mode);
    let validator = Validator::new(config.price_tolerance_pct, config.qty_tolerance_pct, config.mode);
    let mut builder = ReportBuilder::new(config.mode, config.max_failures_listed);

    let mut filtered_out = 0usize;
    for event in events {
        if !config.time_range.contains(event.timestamp) {
            filtered_out += 1;
            continue;
        }

        let outcome = matcher.match_event(event);
        let validation = outcome.order.map(|order| validator.validate(event, order));
        debug!(
            symbol = %event.symbol,
            action = %event.action,
            method = %outcome.method,
            passed = validation.as_ref().is_some_and(|v| v.passed),
            "decision reconciled"
        );
        builder.push(event, &outcome, validation.as_ref());
    }
    if filtered_out > 0 {
        debug!(filtered_out, "decision events outside time range");
    }

    let report = builder.finish(config.time_range);
    let s = &report.summary;
    info!(
        mode = %s.mode,
        events = s.events_considered,
        matched = s.matched,
        passed = s.passed,
        failed = s.failed_or_unmatched,
        "reconciliation complete"
    );
    report
}

/// Full pipeline from raw order records and decision documents.
pub fn reconcile_raw(
    order_values: &[Value],
    documents: &[DecisionDocument],
    config: &ReconcileConfig,
) -> ReconcileReport {
    let (ledger, ledger_stats) = OrderLedger::from_values(order_values);
    let (events, extraction_stats) = extract_events(documents);
    info!(
        orders = ledger.len(),
        events = events.len(),
        "inputs normalized"
    );

    let mut report = reconcile(&ledger, &events, config);
    report.ledger = Some(ledger_stats);
    report.extraction = Some(extraction_stats);
    report
}
