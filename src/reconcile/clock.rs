//! Timestamp Handling
//!
//! Exchange exports carry epoch timestamps of unknown unit, decision logs carry
//! ISO-8601 strings. Everything is normalized to `DateTime<Utc>` here so the
//! matcher compares instants only.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Conversion constants
pub const MILLIS_PER_SEC: i64 = 1_000;
pub const MICROS_PER_SEC: i64 = 1_000_000;
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Display offsets must stay strictly inside this many hours of UTC.
pub const MAX_OFFSET_HOURS: f64 = 24.0;

/// Unit of a raw epoch timestamp, inferred from its decimal digit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochUnit {
    Seconds,
    Millis,
    Micros,
    Nanos,
}

impl EpochUnit {
    /// Infer the unit: >=19 digits ns, >=16 us, >=13 ms, otherwise seconds.
    pub fn detect(raw: i64) -> Self {
        match decimal_digits(raw) {
            d if d >= 19 => EpochUnit::Nanos,
            d if d >= 16 => EpochUnit::Micros,
            d if d >= 13 => EpochUnit::Millis,
            _ => EpochUnit::Seconds,
        }
    }

    /// Number of raw ticks per second.
    #[inline]
    pub fn per_second(self) -> i64 {
        match self {
            EpochUnit::Seconds => 1,
            EpochUnit::Millis => MILLIS_PER_SEC,
            EpochUnit::Micros => MICROS_PER_SEC,
            EpochUnit::Nanos => NANOS_PER_SEC,
        }
    }
}

#[inline]
fn decimal_digits(raw: i64) -> u32 {
    raw.unsigned_abs().checked_ilog10().map_or(1, |d| d + 1)
}

/// Normalize an epoch value of any supported unit to whole seconds (floor).
#[inline]
pub fn epoch_to_seconds(raw: i64) -> i64 {
    raw.div_euclid(EpochUnit::detect(raw).per_second())
}

/// Normalize an epoch value of any supported unit to a UTC instant.
pub fn epoch_to_datetime(raw: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(epoch_to_seconds(raw), 0)
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (including a trailing `Z`), naive date-times with a `T` or
/// space separator, and bare dates. Naive values are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Format whole epoch seconds in a fixed offset as `YYYY-MM-DD HH:MM:SS UTC+HH:MM`.
///
/// The offset is rounded to whole minutes. Returns `None` when the offset is
/// not within ±24 hours or the instant is out of range.
pub fn format_with_offset(seconds: i64, offset_hours: f64) -> Option<String> {
    if !offset_hours.is_finite() || offset_hours.abs() >= MAX_OFFSET_HOURS {
        return None;
    }
    let total_minutes = (offset_hours * 60.0).round() as i64;
    let offset = FixedOffset::east_opt(i32::try_from(total_minutes.checked_mul(60)?).ok()?)?;
    let dt = DateTime::from_timestamp(seconds, 0)?.with_timezone(&offset);

    let sign = if total_minutes >= 0 { '+' } else { '-' };
    let minutes = total_minutes.abs();
    Some(format!(
        "{} UTC{}{:02}:{:02}",
        dt.format("%Y-%m-%d %H:%M:%S"),
        sign,
        minutes / 60,
        minutes % 60
    ))
}
