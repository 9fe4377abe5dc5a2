//! Trade Log Reconciliation Library
//!
//! Exposes the reconciliation engine for use by binaries and tests.

pub mod reconcile;

// Re-export the common entry points at crate root
pub use reconcile::{reconcile, reconcile_raw, ReconcileConfig, ReconcileError, ReconcileMode};
