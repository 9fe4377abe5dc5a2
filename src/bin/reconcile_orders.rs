//! Order / Decision Reconciliation CLI
//!
//! Cross-checks a Binance futures order export against the agent's
//! `decision_*.json` logs and writes a CSV detail table plus a Markdown summary.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin reconcile_orders -- \
//!   --orders ./orders_export.with_timezh.json \
//!   --logs-dir ../decision_logs/binance_e10b9e46_deepseek \
//!   --time-tolerance-sec 180 --price-tol-pct 0.5 --qty-tol-pct 1.0
//! ```
//!
//! # Exit Codes
//!
//! - 0: Run completed (or completed with failures, without `--fail-on-mismatch`)
//! - 1: Run completed with failed/unmatched decisions and `--fail-on-mismatch`
//! - 2: Input, configuration or output error

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tradelog_reconcile::reconcile::clock::parse_timestamp;
use tradelog_reconcile::reconcile::report::ReportContext;
use tradelog_reconcile::reconcile::{
    load_decision_documents, load_order_values, reconcile_raw, ReconcileConfig, ReconcileMode,
    TimeRange,
};

const CSV_FILE_NAME: &str = "orders_decisions_validation.csv";
const SUMMARY_FILE_NAME: &str = "orders_decisions_summary.md";

#[derive(Parser, Debug)]
#[command(name = "reconcile_orders")]
#[command(about = "Cross-check exchange orders against agent decision logs")]
struct Args {
    /// Order export JSON (array of orders with orderId and time)
    #[arg(long)]
    orders: PathBuf,

    /// Directory containing decision_*.json
    #[arg(long)]
    logs_dir: PathBuf,

    /// TOML file with run parameters; flags override it
    #[arg(long, env = "RECONCILE_CONFIG")]
    config: Option<PathBuf>,

    /// Time-window match tolerance in seconds [default: 180]
    #[arg(long)]
    time_tolerance_sec: Option<u64>,

    /// Relative price tolerance in percent [default: 0.5]
    #[arg(long)]
    price_tol_pct: Option<f64>,

    /// Relative quantity tolerance in percent [default: 1.0]
    #[arg(long)]
    qty_tol_pct: Option<f64>,

    /// Strict mode: order_id matching only, position side and reduce-only
    /// must agree, price and quantity must be present and within tolerance
    #[arg(long)]
    strict: bool,

    /// Only check decisions at or after this time (ISO-8601)
    #[arg(long, value_parser = parse_iso)]
    from_iso: Option<DateTime<Utc>>,

    /// Only check decisions at or before this time (ISO-8601)
    #[arg(long, value_parser = parse_iso)]
    to_iso: Option<DateTime<Utc>>,

    /// Report output directory [default: <logs-dir>/reports]
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Also write the full report as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Exit with code 1 when any decision failed or was unmatched
    #[arg(long)]
    fail_on_mismatch: bool,

    /// Debug logging for the reconciliation library
    #[arg(short, long)]
    verbose: bool,
}

fn parse_iso(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_timestamp(s).ok_or_else(|| format!("not an ISO-8601 timestamp: {}", s))
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,tradelog_reconcile=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> Result<ReconcileConfig> {
    let mut config = match &args.config {
        Some(path) => ReconcileConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ReconcileConfig::default(),
    };

    if let Some(secs) = args.time_tolerance_sec {
        config.time_tolerance_secs = secs;
    }
    if let Some(pct) = args.price_tol_pct {
        config.price_tolerance_pct = pct;
    }
    if let Some(pct) = args.qty_tol_pct {
        config.qty_tolerance_pct = pct;
    }
    if args.strict {
        config.mode = ReconcileMode::Strict;
    }
    if args.from_iso.is_some() || args.to_iso.is_some() {
        config.time_range = TimeRange::new(
            args.from_iso.or(config.time_range.from),
            args.to_iso.or(config.time_range.to),
        );
    }

    config.validate()?;
    Ok(config)
}

fn run(args: Args) -> Result<ExitCode> {
    let config = build_config(&args)?;
    info!(
        mode = %config.mode,
        time_tolerance_secs = config.time_tolerance_secs,
        price_tolerance_pct = config.price_tolerance_pct,
        qty_tolerance_pct = config.qty_tolerance_pct,
        "starting reconciliation"
    );

    let orders_path = std::fs::canonicalize(&args.orders).unwrap_or_else(|_| args.orders.clone());
    let logs_dir = std::fs::canonicalize(&args.logs_dir).unwrap_or_else(|_| args.logs_dir.clone());

    let order_values = load_order_values(&orders_path)?;
    let documents = load_decision_documents(&logs_dir)?;

    let report = reconcile_raw(&order_values, &documents, &config);

    let report_dir = args.report_dir.clone().unwrap_or_else(|| logs_dir.join("reports"));
    let csv_path = report_dir.join(CSV_FILE_NAME);
    let md_path = report_dir.join(SUMMARY_FILE_NAME);
    let ctx = ReportContext {
        orders_path: Some(orders_path.display().to_string()),
        logs_dir: Some(logs_dir.display().to_string()),
    };
    report.write_files(&csv_path, &md_path, &ctx)?;
    if let Some(json_path) = &args.json {
        report.write_json(json_path)?;
        println!("JSON report: {}", json_path.display());
    }

    println!("Detail CSV: {}", csv_path.display());
    println!("Summary MD: {}", md_path.display());

    let s = &report.summary;
    println!(
        "{} mode: {} decisions, {} matched, {} passed, {} failed/unmatched",
        s.mode, s.events_considered, s.matched, s.passed, s.failed_or_unmatched
    );

    if args.fail_on_mismatch && s.failed_or_unmatched > 0 {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
