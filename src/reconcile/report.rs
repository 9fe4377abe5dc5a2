//! Reconciliation Report
//!
//! Detail rows, summary totals and the renderers that write them out
//! (CSV detail table, Markdown summary, JSON).

use crate::reconcile::config::{ReconcileMode, TimeRange};
use crate::reconcile::decisions::{DecisionAction, DecisionEvent, EventSource, ExtractionStats};
use crate::reconcile::error::{ReconcileError, Result};
use crate::reconcile::ledger::{LedgerLoadStats, OrderId, OrderSide, PositionSide};
use crate::reconcile::matching::{MatchMethod, MatchOutcome};
use crate::reconcile::validation::{Validation, Verdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Detail table column order.
pub const CSV_HEADER: [&str; 18] = [
    "ts",
    "symbol",
    "action",
    "decision_price",
    "decision_qty",
    "decision_order_id",
    "order_time",
    "order_id",
    "side",
    "positionSide",
    "reduceOnly",
    "avgPrice",
    "executedQty",
    "price_match",
    "qty_match",
    "price_diff_pct",
    "qty_diff_pct",
    "match_method",
];

// =============================================================================
// ROWS
// =============================================================================

/// One decision event with its match and verdicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub ts: DateTime<Utc>,
    pub symbol: String,
    pub action: DecisionAction,
    pub decision_price: Option<f64>,
    pub decision_qty: Option<f64>,
    pub decision_order_id: Option<OrderId>,
    pub source: EventSource,
    pub document: String,

    pub order_time: Option<DateTime<Utc>>,
    pub order_id: Option<OrderId>,
    pub side: Option<OrderSide>,
    pub position_side: Option<PositionSide>,
    pub reduce_only: Option<bool>,
    pub avg_price: Option<f64>,
    pub executed_qty: Option<f64>,

    /// `None` when unmatched
    pub price_verdict: Option<Verdict>,
    pub qty_verdict: Option<Verdict>,
    pub price_diff_pct: Option<f64>,
    pub qty_diff_pct: Option<f64>,
    pub method: MatchMethod,
    pub passed: bool,
}

impl ReportRow {
    pub fn new(event: &DecisionEvent, outcome: &MatchOutcome<'_>, validation: Option<&Validation>) -> Self {
        let order = outcome.order;
        Self {
            ts: event.timestamp,
            symbol: event.symbol.clone(),
            action: event.action,
            decision_price: event.price,
            decision_qty: event.quantity,
            decision_order_id: event.order_id,
            source: event.source,
            document: event.document.clone(),
            order_time: order.map(|o| o.time),
            order_id: order.map(|o| o.order_id),
            side: order.and_then(|o| o.side),
            position_side: order.and_then(|o| o.position_side),
            reduce_only: order.and_then(|o| o.reduce_only),
            avg_price: order.and_then(|o| o.avg_price),
            executed_qty: order.and_then(|o| o.executed_qty),
            price_verdict: validation.map(|v| v.price),
            qty_verdict: validation.map(|v| v.quantity),
            price_diff_pct: validation.and_then(|v| v.price_diff_pct),
            qty_diff_pct: validation.and_then(|v| v.qty_diff_pct),
            method: outcome.method,
            passed: validation.is_some_and(|v| v.passed),
        }
    }

    fn csv_record(&self) -> [String; 18] {
        [
            self.ts.to_rfc3339(),
            self.symbol.clone(),
            self.action.to_string(),
            opt(self.decision_price),
            opt(self.decision_qty),
            opt(self.decision_order_id),
            self.order_time.map(|t| t.to_rfc3339()).unwrap_or_default(),
            opt(self.order_id),
            opt(self.side),
            opt(self.position_side),
            opt(self.reduce_only),
            opt(self.avg_price),
            opt(self.executed_qty),
            self.price_verdict.map(|v| v.code().to_string()).unwrap_or_default(),
            self.qty_verdict.map(|v| v.code().to_string()).unwrap_or_default(),
            pct(self.price_diff_pct),
            pct(self.qty_diff_pct),
            self.method.to_string(),
        ]
    }
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn pct(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}%", v)).unwrap_or_default()
}

// =============================================================================
// SUMMARY
// =============================================================================

/// One failed or unmatched event, for the summary listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureNote {
    pub ts: DateTime<Utc>,
    pub symbol: String,
    pub action: DecisionAction,
    pub reason: String,
}

impl std::fmt::Display for FailureNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} → {}",
            self.ts.to_rfc3339(),
            self.symbol,
            self.action,
            self.reason
        )
    }
}

/// An order claimed by more than one decision event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedOrder {
    pub order_id: OrderId,
    pub events: usize,
}

/// Run totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub mode: ReconcileMode,
    pub events_considered: usize,
    pub matched: usize,
    pub by_identifier: usize,
    pub by_time_window: usize,
    pub passed: usize,
    pub failed_or_unmatched: usize,
    /// Orders matched by several events; permitted, but worth a look
    pub shared_orders: Vec<SharedOrder>,
    /// First failures in event order, capped
    pub failures: Vec<FailureNote>,
    pub failures_truncated: usize,
}

/// Complete output of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub time_range: TimeRange,
    pub ledger: Option<LedgerLoadStats>,
    pub extraction: Option<ExtractionStats>,
    pub rows: Vec<ReportRow>,
    pub summary: ReconcileSummary,
}

/// Failure reason for a matched event that did not pass.
fn failure_reason(row: &ReportRow, validation: &Validation) -> String {
    let mut parts = Vec::new();
    if validation.price.is_fail() {
        parts.push(format!(
            "price mismatch: claimed={} vs avg={} ({})",
            opt(row.decision_price),
            opt(row.avg_price),
            pct(row.price_diff_pct)
        ));
    }
    if validation.direction_mismatch {
        parts.push(format!(
            "direction mismatch: positionSide={} reduceOnly={}",
            opt(row.position_side),
            opt(row.reduce_only)
        ));
    } else if validation.quantity.is_fail() {
        parts.push(format!(
            "quantity mismatch: claimed={} vs executed={} ({})",
            opt(row.decision_qty),
            opt(row.executed_qty),
            pct(row.qty_diff_pct)
        ));
    }
    if parts.is_empty() {
        "missing price or quantity".to_string()
    } else {
        parts.join("; ")
    }
}

/// Accumulates rows and totals in event order.
#[derive(Debug)]
pub struct ReportBuilder {
    mode: ReconcileMode,
    max_failures: usize,
    rows: Vec<ReportRow>,
    matched: usize,
    by_identifier: usize,
    by_time_window: usize,
    passed: usize,
    failures: Vec<FailureNote>,
    failures_total: usize,
    claims_per_order: BTreeMap<OrderId, usize>,
}

impl ReportBuilder {
    pub fn new(mode: ReconcileMode, max_failures: usize) -> Self {
        Self {
            mode,
            max_failures,
            rows: Vec::new(),
            matched: 0,
            by_identifier: 0,
            by_time_window: 0,
            passed: 0,
            failures: Vec::new(),
            failures_total: 0,
            claims_per_order: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, event: &DecisionEvent, outcome: &MatchOutcome<'_>, validation: Option<&Validation>) {
        let row = ReportRow::new(event, outcome, validation);

        match outcome.method {
            MatchMethod::ByIdentifier => self.by_identifier += 1,
            MatchMethod::ByTimeWindow => self.by_time_window += 1,
            MatchMethod::Unmatched => {}
        }
        if let Some(order) = outcome.order {
            self.matched += 1;
            *self.claims_per_order.entry(order.order_id).or_insert(0) += 1;
        }

        let reason = match validation {
            None => Some("no matching order found".to_string()),
            Some(v) if !v.passed => Some(failure_reason(&row, v)),
            Some(_) => None,
        };
        match reason {
            None => self.passed += 1,
            Some(reason) => {
                self.failures_total += 1;
                if self.failures.len() < self.max_failures {
                    self.failures.push(FailureNote {
                        ts: row.ts,
                        symbol: row.symbol.clone(),
                        action: row.action,
                        reason,
                    });
                }
            }
        }

        self.rows.push(row);
    }

    pub fn finish(self, time_range: TimeRange) -> ReconcileReport {
        let events_considered = self.rows.len();
        let shared_orders = self
            .claims_per_order
            .into_iter()
            .filter(|&(_, events)| events > 1)
            .map(|(order_id, events)| SharedOrder { order_id, events })
            .collect();

        ReconcileReport {
            time_range,
            ledger: None,
            extraction: None,
            rows: self.rows,
            summary: ReconcileSummary {
                mode: self.mode,
                events_considered,
                matched: self.matched,
                by_identifier: self.by_identifier,
                by_time_window: self.by_time_window,
                passed: self.passed,
                failed_or_unmatched: events_considered - self.passed,
                shared_orders,
                failures_truncated: self.failures_total - self.failures.len(),
                failures: self.failures,
            },
        }
    }
}

// =============================================================================
// RENDERERS
// =============================================================================

/// Where the inputs came from, printed in the Markdown summary.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub orders_path: Option<String>,
    pub logs_dir: Option<String>,
}

impl ReconcileReport {
    /// Write the detail table as CSV.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> std::result::Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_HEADER)?;
        for row in &self.rows {
            wtr.write_record(row.csv_record())?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Render the Markdown summary.
    pub fn render_markdown(&self, ctx: &ReportContext) -> String {
        let s = &self.summary;
        let mut out = String::new();

        let _ = writeln!(out, "# Order / Decision Reconciliation Summary\n");
        let _ = writeln!(out, "- Mode: {}", s.mode);
        let _ = writeln!(out, "- Successful decision events: {}", s.events_considered);
        let _ = writeln!(
            out,
            "- Matched to orders: {} (by identifier: {}, by time window: {})",
            s.matched, s.by_identifier, s.by_time_window
        );
        let _ = writeln!(out, "- Passed: {}", s.passed);
        let _ = writeln!(out, "- Failed or unmatched: {}", s.failed_or_unmatched);
        if let Some(ledger) = &self.ledger {
            let _ = writeln!(
                out,
                "- Orders loaded: {} of {} ({} dropped)",
                ledger.loaded, ledger.total, ledger.dropped
            );
        }
        if let Some(extraction) = &self.extraction {
            let _ = writeln!(
                out,
                "- Decision documents: {} scanned, {} skipped; {} execution-log duplicates suppressed",
                extraction.documents_scanned,
                extraction.documents_skipped,
                extraction.duplicates_suppressed
            );
        }
        if let Some(path) = &ctx.orders_path {
            let _ = writeln!(out, "- Orders file: `{}`", path);
        }
        if let Some(dir) = &ctx.logs_dir {
            let _ = writeln!(out, "- Decision log directory: `{}`", dir);
        }
        if let Some(from) = self.time_range.from {
            let _ = writeln!(out, "- From: {}", from.to_rfc3339());
        }
        if let Some(to) = self.time_range.to {
            let _ = writeln!(out, "- To: {}", to.to_rfc3339());
        }

        if !s.shared_orders.is_empty() {
            let _ = writeln!(out, "\n## Orders claimed by multiple decisions\n");
            for shared in &s.shared_orders {
                let _ = writeln!(out, "- order {} ← {} decisions", shared.order_id, shared.events);
            }
        }

        let _ = writeln!(out, "\n## Failures (first {})\n", s.failures.len());
        for note in &s.failures {
            let _ = writeln!(out, "- {}", note);
        }
        if s.failures_truncated > 0 {
            let _ = writeln!(out, "- … {} more not listed", s.failures_truncated);
        }
        out
    }

    /// Write CSV detail and Markdown summary files.
    pub fn write_files(&self, csv_path: &Path, md_path: &Path, ctx: &ReportContext) -> Result<()> {
        for path in [csv_path, md_path] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| ReconcileError::ReportWrite {
                    path: parent.to_path_buf(),
                    source: Box::new(e),
                })?;
            }
        }

        let file = fs::File::create(csv_path).map_err(|e| ReconcileError::ReportWrite {
            path: csv_path.to_path_buf(),
            source: Box::new(e),
        })?;
        self.write_csv(std::io::BufWriter::new(file))
            .map_err(|e| ReconcileError::ReportWrite {
                path: csv_path.to_path_buf(),
                source: Box::new(e),
            })?;

        fs::write(md_path, self.render_markdown(ctx)).map_err(|e| ReconcileError::ReportWrite {
            path: md_path.to_path_buf(),
            source: Box::new(e),
        })?;
        Ok(())
    }

    /// Write the whole report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ReconcileError::ReportWrite {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        fs::write(path, json).map_err(|e| ReconcileError::ReportWrite {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }
}
