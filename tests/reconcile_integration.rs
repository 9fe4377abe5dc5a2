//! Integration tests for the reconcile_orders and add_timezh CLIs
//!
//! Each test builds an order export and a decision log directory in a
//! temporary directory, runs the binary and inspects the written reports.

use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const T_MS: i64 = 1_762_776_000_000; // 2025-11-10T12:00:00Z

fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn orders_fixture() -> Value {
    json!([
        {
            "orderId": 5001,
            "symbol": "ETHUSDT",
            "status": "FILLED",
            "side": "BUY",
            "positionSide": "LONG",
            "reduceOnly": false,
            "type": "MARKET",
            "avgPrice": "2000",
            "executedQty": "1.0",
            "time": T_MS
        },
        {
            "orderId": 5002,
            "symbol": "BTCUSDT",
            "status": "NEW",
            "side": "SELL",
            "positionSide": "LONG",
            "avgPrice": "0",
            "executedQty": "0",
            "time": T_MS
        }
    ])
}

/// Creates `orders.json` and `logs/decision_*.json` under a fresh temp dir.
fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_json(&dir.path().join("orders.json"), &orders_fixture());

    let logs = dir.path().join("logs");
    fs::create_dir(&logs).unwrap();
    write_json(
        &logs.join("decision_20251110_120030.json"),
        &json!({
            "timestamp": "2025-11-10T12:00:30Z",
            "decisions": [
                {"action": "open_long", "symbol": "ETHUSDT", "price": 2005, "quantity": 1.0, "success": true}
            ],
            "execution_log": ["✓ ETHUSDT open_long 成功", "✓ BTCUSDT close_long 成功"]
        }),
    );
    // Not a decision file
    fs::write(logs.join("notes.txt"), "ignore me").unwrap();
    dir
}

fn reconcile_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_reconcile_orders"));
    cmd.env_remove("RECONCILE_CONFIG")
        .arg("--orders")
        .arg(dir.path().join("orders.json"))
        .arg("--logs-dir")
        .arg(dir.path().join("logs"));
    cmd
}

#[test]
fn test_reconcile_writes_reports() {
    let dir = setup();
    let output = reconcile_cmd(&dir).output().expect("failed to run reconcile_orders");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Detail CSV:"), "{}", stdout);
    assert!(stdout.contains("Summary MD:"), "{}", stdout);

    let reports = dir.path().join("logs").join("reports");
    let csv = fs::read_to_string(reports.join("orders_decisions_validation.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    // header + ETH structured + BTC execution log (ETH log line is a duplicate)
    assert_eq!(lines.len(), 3, "{}", csv);
    assert!(lines[1].contains("ETHUSDT"));
    assert!(lines[1].ends_with(",by_time_window"), "{}", lines[1]);
    assert!(lines[2].contains("BTCUSDT"));
    assert!(lines[2].ends_with(",unmatched"), "{}", lines[2]);

    let md = fs::read_to_string(reports.join("orders_decisions_summary.md")).unwrap();
    assert!(md.contains("- Mode: lenient"), "{}", md);
    assert!(md.contains("- Successful decision events: 2"), "{}", md);
    assert!(md.contains("no matching order found"), "{}", md);
}

#[test]
fn test_reconcile_fail_on_mismatch_exit_code() {
    let dir = setup();
    let status = reconcile_cmd(&dir)
        .arg("--fail-on-mismatch")
        .status()
        .expect("failed to run reconcile_orders");
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_reconcile_strict_mode_and_report_dir() {
    let dir = setup();
    let out = dir.path().join("out");
    let json_path = dir.path().join("report.json");
    let output = reconcile_cmd(&dir)
        .arg("--strict")
        .arg("--report-dir")
        .arg(&out)
        .arg("--json")
        .arg(&json_path)
        .output()
        .expect("failed to run reconcile_orders");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let md = fs::read_to_string(out.join("orders_decisions_summary.md")).unwrap();
    assert!(md.contains("- Mode: strict"), "{}", md);

    let report: Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(report["summary"]["matched"], 0);
    assert_eq!(report["summary"]["failed_or_unmatched"], 2);
}

#[test]
fn test_reconcile_missing_ledger_is_fatal() {
    let dir = setup();
    let output = Command::new(env!("CARGO_BIN_EXE_reconcile_orders"))
        .env_remove("RECONCILE_CONFIG")
        .arg("--orders")
        .arg(dir.path().join("missing.json"))
        .arg("--logs-dir")
        .arg(dir.path().join("logs"))
        .output()
        .expect("failed to run reconcile_orders");
    assert_eq!(output.status.code(), Some(2));
    assert!(!dir.path().join("logs").join("reports").exists());
}

#[test]
fn test_reconcile_non_array_ledger_is_fatal() {
    let dir = setup();
    write_json(&dir.path().join("orders.json"), &json!({"orders": []}));
    let output = reconcile_cmd(&dir).output().expect("failed to run reconcile_orders");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("array"), "{}", stderr);
}

#[test]
fn test_reconcile_config_file_with_flag_override() {
    let dir = setup();
    let config = dir.path().join("reconcile.toml");
    // Zero-second window would leave ETH unmatched
    fs::write(&config, "time_tolerance_secs = 0\nmode = \"lenient\"\n").unwrap();

    let json_path = dir.path().join("report.json");
    let output = reconcile_cmd(&dir)
        .arg("--config")
        .arg(&config)
        .arg("--time-tolerance-sec")
        .arg("180")
        .arg("--json")
        .arg(&json_path)
        .output()
        .expect("failed to run reconcile_orders");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(report["summary"]["matched"], 1);
}

#[test]
fn test_add_timezh_default_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("orders_export.json");
    write_json(
        &input,
        &json!([
            {"orderId": 1, "time": 1_700_000_000_000i64},
            {"orderId": 2, "updateTime": 1_700_000_000},
            {"orderId": 3},
            "not an object"
        ]),
    );

    let output = Command::new(env!("CARGO_BIN_EXE_add_timezh"))
        .arg("--input")
        .arg(&input)
        .output()
        .expect("failed to run add_timezh");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Updated objects: 1"), "{}", stdout);

    let written = dir.path().join("orders_export.with_timezh.json");
    let data: Value = serde_json::from_str(&fs::read_to_string(&written).unwrap()).unwrap();
    assert_eq!(data[0]["timezh"], "2023-11-15 06:13:20 UTC+08:00");
    // Only `time` is decorated
    assert!(data[1].get("timezh").is_none());
    assert!(data[2].get("timezh").is_none());
    assert_eq!(data[3], "not an object");
}

#[test]
fn test_add_timezh_inplace_rejects_non_array() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("orders.json");
    write_json(&input, &json!({"orderId": 1}));

    let status = Command::new(env!("CARGO_BIN_EXE_add_timezh"))
        .arg("--input")
        .arg(&input)
        .arg("--inplace")
        .status()
        .expect("failed to run add_timezh");
    assert!(!status.success());
}

#[test]
fn test_add_timezh_keeps_key_order() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("orders.json");
    fs::write(
        &input,
        r#"[{"time": 1700000000000, "symbol": "BTCUSDT", "orderId": 1, "avgPrice": "0"}]"#,
    )
    .unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_add_timezh"))
        .arg("--input")
        .arg(&input)
        .arg("--inplace")
        .status()
        .expect("failed to run add_timezh");
    assert!(status.success());

    let data: Value = serde_json::from_str(&fs::read_to_string(&input).unwrap()).unwrap();
    let keys: Vec<&str> = data[0].as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["time", "symbol", "orderId", "avgPrice", "timezh"]);
}

#[test]
fn test_add_timezh_rejects_huge_offset() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("orders.json");
    write_json(&input, &json!([{"orderId": 1, "time": 1_700_000_000}]));

    let output = Command::new(env!("CARGO_BIN_EXE_add_timezh"))
        .arg("--input")
        .arg(&input)
        .arg("--offset-hours")
        .arg("1e18")
        .output()
        .expect("failed to run add_timezh");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--offset-hours"), "{}", stderr);
    assert!(!dir.path().join("orders.with_timezh.json").exists());
}
