//! Input Loading
//!
//! Reads the order export and the decision log directory from disk. Missing
//! inputs are fatal; a single unreadable decision document is only skipped.

use crate::reconcile::decisions::DecisionDocument;
use crate::reconcile::error::{json_kind, ReconcileError, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// File name prefix of decision documents.
pub const DECISION_FILE_PREFIX: &str = "decision_";
/// File name suffix of decision documents.
pub const DECISION_FILE_SUFFIX: &str = ".json";

/// Read the order export: a JSON array of loosely-typed order objects.
pub fn load_order_values(path: &Path) -> Result<Vec<Value>> {
    if !path.is_file() {
        return Err(ReconcileError::LedgerNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = fs::read_to_string(path).map_err(|e| ReconcileError::LedgerUnreadable {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| ReconcileError::LedgerUnreadable {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    match value {
        Value::Array(values) => {
            info!(path = %path.display(), records = values.len(), "order export loaded");
            Ok(values)
        }
        other => Err(ReconcileError::LedgerNotArray {
            path: path.to_path_buf(),
            found: json_kind(&other),
        }),
    }
}

/// Whether `name` looks like a decision document.
pub fn is_decision_file(name: &str) -> bool {
    name.starts_with(DECISION_FILE_PREFIX) && name.ends_with(DECISION_FILE_SUFFIX)
}

/// Read every `decision_*.json` document in `dir`, sorted by file name.
pub fn load_decision_documents(dir: &Path) -> Result<Vec<DecisionDocument>> {
    if !dir.is_dir() {
        return Err(ReconcileError::DecisionDirNotFound {
            path: dir.to_path_buf(),
        });
    }
    let entries = fs::read_dir(dir).map_err(|e| ReconcileError::DecisionDirUnreadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut documents = Vec::new();
    let mut skipped = 0usize;
    for entry in entries {
        let entry = entry.map_err(|e| ReconcileError::DecisionDirUnreadable {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_decision_file(&name) {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let body = match fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str::<Value>(&s).map_err(|e| e.to_string()))
        {
            Ok(body) => body,
            Err(e) => {
                warn!(document = %name, error = %e, "skipping unreadable decision document");
                skipped += 1;
                continue;
            }
        };
        if !body.is_object() {
            warn!(document = %name, found = json_kind(&body), "skipping decision document that is not an object");
            skipped += 1;
            continue;
        }

        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        debug!(document = %name, "decision document loaded");
        documents.push(DecisionDocument {
            name,
            modified,
            body,
        });
    }

    documents.sort_by(|a, b| a.name.cmp(&b.name));
    info!(
        dir = %dir.display(),
        documents = documents.len(),
        skipped,
        "decision documents loaded"
    );
    Ok(documents)
}
