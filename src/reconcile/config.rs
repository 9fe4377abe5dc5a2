//! Reconciliation run configuration
//!
//! Tolerances, validation mode and the optional decision time range. Loadable
//! from TOML; command-line flags override individual fields.

use crate::reconcile::error::{ReconcileError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Validation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// Missing data is not a failure; time-window matching allowed
    #[default]
    Lenient,
    /// Identifier matching only; price and quantity must be present and agree
    Strict,
}

impl ReconcileMode {
    pub fn is_strict(self) -> bool {
        matches!(self, ReconcileMode::Strict)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileMode::Lenient => "lenient",
            ReconcileMode::Strict => "strict",
        }
    }
}

impl std::fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive decision time filter. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    #[inline]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts <= to)
    }
}

/// Parameters of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Half-width of the time-window match (seconds)
    #[serde(default = "default_time_tolerance_secs")]
    pub time_tolerance_secs: u64,

    /// Relative price tolerance (%)
    #[serde(default = "default_price_tolerance_pct")]
    pub price_tolerance_pct: f64,

    /// Relative quantity tolerance (%)
    #[serde(default = "default_qty_tolerance_pct")]
    pub qty_tolerance_pct: f64,

    #[serde(default)]
    pub mode: ReconcileMode,

    #[serde(default)]
    pub time_range: TimeRange,

    /// Failure notes kept in the summary
    #[serde(default = "default_max_failures_listed")]
    pub max_failures_listed: usize,
}

fn default_time_tolerance_secs() -> u64 {
    180
}

fn default_price_tolerance_pct() -> f64 {
    0.5
}

fn default_qty_tolerance_pct() -> f64 {
    1.0
}

fn default_max_failures_listed() -> usize {
    100
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            time_tolerance_secs: default_time_tolerance_secs(),
            price_tolerance_pct: default_price_tolerance_pct(),
            qty_tolerance_pct: default_qty_tolerance_pct(),
            mode: ReconcileMode::default(),
            time_range: TimeRange::default(),
            max_failures_listed: default_max_failures_listed(),
        }
    }
}

impl ReconcileConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ReconcileError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ReconcileError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject tolerances and ranges that cannot be evaluated.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("price_tolerance_pct", self.price_tolerance_pct),
            ("qty_tolerance_pct", self.qty_tolerance_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ReconcileError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if i64::try_from(self.time_tolerance_secs).is_err() {
            return Err(ReconcileError::Config(format!(
                "time_tolerance_secs out of range: {}",
                self.time_tolerance_secs
            )));
        }
        if let (Some(from), Some(to)) = (self.time_range.from, self.time_range.to) {
            if from > to {
                return Err(ReconcileError::Config(format!(
                    "time range start {} is after end {}",
                    from.to_rfc3339(),
                    to.to_rfc3339()
                )));
            }
        }
        Ok(())
    }
}
