//! Execution Log Parser
//!
//! The agent also writes human-readable execution lines such as
//! `✓ BTCUSDT open_long 成功`. They carry no price, quantity or order id, but
//! they are the only trace of actions whose structured entry was lost.

use crate::reconcile::decisions::{
    DecisionAction, DecisionDocument, DecisionEvent, EventExtractor, EventSource,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Checkmark, USDT-quoted symbol, action keyword, success marker.
pub const EXECUTION_LINE_PATTERN: &str =
    r"[✓✔]\s*([A-Z0-9]+USDT)\s+(open_long|open_short|close_long|close_short)\s*成功";

static EXECUTION_LINE_RE: OnceLock<Regex> = OnceLock::new();

fn execution_line_re() -> &'static Regex {
    EXECUTION_LINE_RE
        .get_or_init(|| Regex::new(EXECUTION_LINE_PATTERN).expect("execution line pattern is valid"))
}

/// Symbol and action of a successful execution line, if the line is one.
pub fn parse_execution_line(line: &str) -> Option<(&str, DecisionAction)> {
    let caps = execution_line_re().captures(line)?;
    let symbol = caps.get(1)?.as_str();
    let action = DecisionAction::parse(caps.get(2)?.as_str())?;
    Some((symbol, action))
}

/// Reads the `execution_log` array. Every event sits at the document base time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionLogExtractor;

impl ExecutionLogExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl EventExtractor for ExecutionLogExtractor {
    fn extract(&self, doc: &DecisionDocument, base_ts: DateTime<Utc>) -> Vec<DecisionEvent> {
        let Some(lines) = doc.body.get("execution_log").and_then(Value::as_array) else {
            return Vec::new();
        };
        lines
            .iter()
            .filter_map(Value::as_str)
            .filter_map(parse_execution_line)
            .map(|(symbol, action)| DecisionEvent {
                timestamp: base_ts,
                symbol: symbol.to_string(),
                action,
                price: None,
                quantity: None,
                order_id: None,
                success: true,
                source: EventSource::ExecutionLog,
                document: doc.name.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_execution_line_hits() {
        assert_eq!(
            parse_execution_line("  ✓ BTCUSDT open_long 成功"),
            Some(("BTCUSDT", DecisionAction::OpenLong))
        );
        assert_eq!(
            parse_execution_line("[12:00:01] ✔ 1000PEPEUSDT close_short成功 (qty 120)"),
            Some(("1000PEPEUSDT", DecisionAction::CloseShort))
        );
    }

    #[test]
    fn test_parse_execution_line_misses() {
        // failure marker
        assert_eq!(parse_execution_line("❌ BTCUSDT open_long 失败"), None);
        // no checkmark
        assert_eq!(parse_execution_line("BTCUSDT open_long 成功"), None);
        // wrong quote currency
        assert_eq!(parse_execution_line("✓ BTCBUSD open_long 成功"), None);
        // not an action keyword
        assert_eq!(parse_execution_line("✓ BTCUSDT hold 成功"), None);
    }
}
