//! Order Export Time Decoration
//!
//! Adds a `timezh` field (local wall-clock time, Beijing by default) to every
//! order in an exported JSON array.
//!
//! Usage:
//!   cargo run --bin add_timezh -- --input orders_export.json
//!   cargo run --bin add_timezh -- --input orders_export.json --inplace --offset-hours 0

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tradelog_reconcile::reconcile::clock::MAX_OFFSET_HOURS;
use tradelog_reconcile::reconcile::timezh::{add_timezh, DEFAULT_OFFSET_HOURS};

#[derive(Parser, Debug)]
#[command(name = "add_timezh")]
#[command(about = "Add a human-readable timezh field to each order in a JSON export")]
struct Args {
    /// Input JSON file (array)
    #[arg(short, long, default_value = "orders_export.json")]
    input: PathBuf,

    /// Output JSON file [default: <input>.with_timezh.json, or the input with --inplace]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite the input file
    #[arg(long)]
    inplace: bool,

    /// Output indentation
    #[arg(long, default_value_t = 2)]
    indent: usize,

    /// Timezone offset in hours (8 = UTC+08:00, 0 = UTC)
    #[arg(long, default_value_t = DEFAULT_OFFSET_HOURS, allow_negative_numbers = true)]
    offset_hours: f64,
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "orders_export".to_string());
    input.with_file_name(format!("{}.with_timezh.json", stem))
}

fn to_pretty_json(value: &Value, indent: usize) -> Result<Vec<u8>> {
    let indent = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if !args.offset_hours.is_finite() || args.offset_hours.abs() >= MAX_OFFSET_HOURS {
        bail!(
            "--offset-hours must be within ±{} hours, got {}",
            MAX_OFFSET_HOURS,
            args.offset_hours
        );
    }
    if !args.input.exists() {
        bail!("Input file does not exist: {}", args.input.display());
    }
    let contents = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let mut data: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse JSON: {}", args.input.display()))?;

    let Some(records) = data.as_array_mut() else {
        bail!("Top level of {} must be a JSON array", args.input.display());
    };
    let updated = add_timezh(records, args.offset_hours);
    info!(updated, total = records.len(), "timezh added");

    let out_path = match (&args.output, args.inplace) {
        (Some(path), _) => path.clone(),
        (None, true) => args.input.clone(),
        (None, false) => default_output_path(&args.input),
    };
    fs::write(&out_path, to_pretty_json(&data, args.indent)?)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;

    println!("Updated objects: {}", updated);
    println!("Written: {}", out_path.display());
    Ok(())
}
