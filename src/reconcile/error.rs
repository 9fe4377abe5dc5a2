//! Reconciliation Errors
//!
//! Only input-absence problems are errors. Malformed individual records are
//! dropped where they are parsed, and an unmatched decision is a normal
//! outcome that ends up in the report.

use std::path::PathBuf;

/// Fatal errors that abort a reconciliation run before matching starts.
#[derive(Debug)]
pub enum ReconcileError {
    /// Order ledger file does not exist
    LedgerNotFound { path: PathBuf },
    /// Order ledger file exists but could not be read or decoded
    LedgerUnreadable {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Order ledger top level is not a JSON array
    LedgerNotArray { path: PathBuf, found: &'static str },
    /// Decision log directory does not exist or is not a directory
    DecisionDirNotFound { path: PathBuf },
    /// Decision log directory could not be listed
    DecisionDirUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid run parameters
    Config(String),
    /// Report output could not be written
    ReportWrite {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LedgerNotFound { path } => {
                write!(f, "order ledger not found: {}", path.display())
            }
            Self::LedgerUnreadable { path, source } => {
                write!(f, "failed to read order ledger {}: {}", path.display(), source)
            }
            Self::LedgerNotArray { path, found } => write!(
                f,
                "order ledger {} must be a JSON array at top level, found {}",
                path.display(),
                found
            ),
            Self::DecisionDirNotFound { path } => {
                write!(f, "decision log directory not found: {}", path.display())
            }
            Self::DecisionDirUnreadable { path, source } => write!(
                f,
                "failed to list decision log directory {}: {}",
                path.display(),
                source
            ),
            Self::Config(msg) => write!(f, "invalid configuration: {}", msg),
            Self::ReportWrite { path, source } => {
                write!(f, "failed to write report {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LedgerUnreadable { source, .. } | Self::ReportWrite { source, .. } => {
                Some(source.as_ref())
            }
            Self::DecisionDirUnreadable { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Short JSON type name used in diagnostics.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
