//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: per-step series and trade list for external analysis tools
//! - **Markdown**: human-readable single-run report and side-by-side comparison
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use spreadlab_core::engine::TradeRecord;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.8}")).unwrap_or_default()
}

/// Export the per-step series as CSV.
///
/// Columns: step, date, observation, equilibrium, innovation_variance, z,
/// deviation, position, hold, pnl, equity. Undefined values are empty.
pub fn export_steps_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "step",
        "date",
        "observation",
        "equilibrium",
        "innovation_variance",
        "z",
        "deviation",
        "position",
        "hold",
        "pnl",
        "equity",
    ])?;

    for t in 0..result.len() {
        let position = result.positions.get(t).copied().unwrap_or_default();
        let innovation = result
            .innovation_variance
            .as_ref()
            .and_then(|s| s.get(t))
            .copied();
        wtr.write_record([
            t.to_string(),
            result.dates.get(t).map(|d| d.to_string()).unwrap_or_default(),
            opt(result.observations.get(t).copied().flatten()),
            opt(result.equilibrium.get(t).copied().flatten()),
            opt(innovation),
            opt(result.z.get(t).copied().flatten()),
            opt(result.deviations.get(t).copied().flatten()),
            position.label().to_string(),
            position.hold().to_string(),
            format!("{:.8}", result.returns[t]),
            format!("{:.8}", result.equity[t]),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export a trade list as CSV.
///
/// Columns: side, entry_step, entry_date, entry_z, exit_step, exit_date,
/// exit_z, exit_reason, bars_held, trade_return
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "side",
        "entry_step",
        "entry_date",
        "entry_z",
        "exit_step",
        "exit_date",
        "exit_z",
        "exit_reason",
        "bars_held",
        "trade_return",
    ])?;

    for t in trades {
        wtr.write_record([
            format!("{:?}", t.side).to_lowercase(),
            t.entry_step.to_string(),
            t.entry_date.map(|d| d.to_string()).unwrap_or_default(),
            opt(t.entry_z),
            t.exit_step.to_string(),
            t.exit_date.map(|d| d.to_string()).unwrap_or_default(),
            opt(t.exit_z),
            serde_json::to_value(t.exit_reason)?
                .as_str()
                .unwrap_or_default()
                .to_string(),
            t.bars_held.to_string(),
            format!("{:.8}", t.trade_return),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `{name}_{run_id prefix}/` under `output_dir`
/// containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `steps.csv`: per-step series
/// - `trades.csv`: round-trip trades
/// - `report.md`: Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let prefix = result.run_id.get(..12).unwrap_or(&result.run_id);
    let run_dir = output_dir.join(format!("{}_{prefix}", result.config.name));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let write = |file: &str, contents: String| -> Result<()> {
        let path = run_dir.join(file);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))
    };

    write("manifest.json", export_json(result)?)?;
    write("steps.csv", export_steps_csv(result)?)?;
    write("trades.csv", export_trades_csv(&result.trades)?)?;
    write("report.md", generate_report(result))?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(1024);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    let _ = writeln!(md, "| Name | {} |", result.config.name);
    let _ = writeln!(md, "| Estimator | {} |", result.estimator);
    let _ = writeln!(md, "| Calendar | {} |", result.calendar);
    if let (Some(start), Some(end)) = (result.start_date(), result.end_date()) {
        let _ = writeln!(md, "| Period | {start} to {end} |");
    }
    let _ = writeln!(md, "| Steps | {} |", result.len());
    let _ = writeln!(md, "| Run ID | {} |", result.run_id);
    let _ = writeln!(md, "| Dataset Hash | {} |", result.dataset_hash);
    if result.is_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    for (label, value) in metric_rows(result) {
        let _ = writeln!(md, "| {label} | {value} |");
    }
    md
}

/// Generate a side-by-side Markdown comparison of several runs.
pub fn generate_comparison(results: &[BacktestResult]) -> String {
    let mut md = String::from("# Strategy Comparison\n\n| Metric |");
    for r in results {
        let _ = write!(md, " {} |", r.config.name);
    }
    md.push_str("\n| --- |");
    md.push_str(&" --- |".repeat(results.len()));
    md.push('\n');

    let rows: Vec<Vec<(&'static str, String)>> = results.iter().map(metric_rows).collect();
    if let Some(first) = rows.first() {
        for (i, (label, _)) in first.iter().enumerate() {
            let _ = write!(md, "| {label} |");
            for row in &rows {
                let _ = write!(md, " {} |", row[i].1);
            }
            md.push('\n');
        }
    }
    md
}

fn metric_rows(result: &BacktestResult) -> Vec<(&'static str, String)> {
    let m = &result.metrics;
    vec![
        ("Annualized Return", format!("{:.2}%", m.annualized_return * 100.0)),
        ("Sharpe", format!("{:.3}", m.sharpe)),
        ("Max Drawdown", format!("{:.2}%", m.max_drawdown * 100.0)),
        ("Total Return", format!("{:.2}%", m.total_return * 100.0)),
        ("Trades", m.trade_count.to_string()),
        ("Win Rate", format!("{:.1}%", m.win_rate * 100.0)),
        ("Avg Bars Held", format!("{:.1}", m.avg_bars_held)),
        ("Exposure", format!("{:.1}%", m.exposure * 100.0)),
        ("Stop-Loss Exits", m.stop_loss_exits.to_string()),
        ("Time-Stop Exits", m.time_stop_exits.to_string()),
        ("Blocked Entries", result.blocked_entries.to_string()),
    ]
}
