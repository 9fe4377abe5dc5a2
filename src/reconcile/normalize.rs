//! Loose Field Coercion
//!
//! Exchange exports and agent logs are loosely typed: numbers arrive as JSON
//! numbers or strings, booleans as strings, identifiers as floats. Each helper
//! turns one `serde_json::Value` into an `Option` of the target type and never
//! fails, so a bad field only ever blanks that field.

use serde_json::Value;

/// Coerce to a signed integer: integers as-is, finite floats truncated,
/// strings parsed after trimming.
pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Coerce to an order identifier (non-negative integer).
pub fn coerce_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) if n.is_u64() => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => coerce_i64(value).and_then(|v| u64::try_from(v).ok()),
    }
}

/// Coerce to a float: numbers or numeric strings.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Coerce to a non-negative float (prices, quantities).
pub fn coerce_non_negative(value: &Value) -> Option<f64> {
    coerce_f64(value).filter(|f| *f >= 0.0)
}

/// Coerce to a boolean: JSON bools, `"true"`/`"false"` in any case, 0 or 1.
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// Borrow a non-empty string.
pub fn coerce_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

/// Look up `key` in an object and apply `f`; absent keys and explicit nulls
/// both yield `None`.
pub fn field<'a, T>(
    obj: &'a serde_json::Map<String, Value>,
    key: &str,
    f: impl FnOnce(&'a Value) -> Option<T>,
) -> Option<T> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => f(v),
    }
}
