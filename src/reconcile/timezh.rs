//! Local-Time Decoration
//!
//! Adds a human-readable `timezh` field next to the epoch `time` of each order
//! in an export, e.g. `2025-11-10 21:50:49 UTC+08:00`. Reconciliation never
//! reads the field; it is for people eyeballing the export.

use crate::reconcile::clock::{epoch_to_seconds, format_with_offset};
use crate::reconcile::normalize::coerce_i64;
use serde_json::Value;

/// Name of the added field.
pub const TIMEZH_FIELD: &str = "timezh";

/// Default offset: Beijing time.
pub const DEFAULT_OFFSET_HOURS: f64 = 8.0;

/// Decorate every object that has a parseable `time` (integer, truncated
/// float, or integer string). Returns how many were updated; everything else
/// is left untouched.
pub fn add_timezh(records: &mut [Value], offset_hours: f64) -> usize {
    let mut updated = 0;
    for record in records.iter_mut() {
        let Some(obj) = record.as_object_mut() else {
            continue;
        };
        let Some(raw) = obj.get("time").and_then(coerce_i64) else {
            continue;
        };
        let Some(formatted) = format_with_offset(epoch_to_seconds(raw), offset_hours) else {
            continue;
        };
        obj.insert(TIMEZH_FIELD.to_string(), Value::String(formatted));
        updated += 1;
    }
    updated
}
