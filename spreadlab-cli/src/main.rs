//! SpreadLab CLI: run, compare and sweep spread mean-reversion backtests.
//!
//! Commands:
//! - `run`: execute one backtest from a TOML config file or named preset
//! - `compare`: run the baseline and enhanced presets side by side
//! - `sweep`: grid over entry/exit thresholds (and filter noise)
//! - `init-config`: write a preset as an editable TOML file

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use spreadlab_runner::{
    generate_comparison, load_observations, run_batch, run_loaded, save_artifacts,
    synthetic_spread, BacktestConfig, BacktestResult, CalendarConfig, LoadedData, ParamGrid,
    ParamSweep,
};

#[derive(Parser)]
#[command(
    name = "spreadlab",
    version,
    about = "SpreadLab CLI: z-score mean-reversion backtests on a spread series"
)]
struct Cli {
    /// Info-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Debug-level logging.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file or named preset.
    Run {
        /// Path to a TOML config file.
        #[arg(long, conflicts_with = "preset")]
        config: Option<PathBuf>,

        /// Named preset: baseline, enhanced.
        #[arg(long)]
        preset: Option<String>,

        #[command(flatten)]
        data: DataArgs,

        /// Event-date CSV; overrides the config's calendar.
        #[arg(long)]
        events: Option<PathBuf>,

        /// Output directory for artifacts. Nothing is written without it.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Run the baseline and enhanced presets on the same data.
    Compare {
        #[command(flatten)]
        data: DataArgs,

        /// Event-date CSV used by the enhanced preset.
        #[arg(long)]
        events: Option<PathBuf>,

        /// Run sequentially instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Output directory for artifacts.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Sweep entry/exit thresholds around a preset.
    Sweep {
        /// Base preset: baseline, enhanced.
        #[arg(long, default_value = "enhanced")]
        preset: String,

        #[command(flatten)]
        data: DataArgs,

        /// Entry thresholds (comma-separated).
        #[arg(long, value_delimiter = ',', default_values_t = [1.5, 2.0, 2.5])]
        entry: Vec<f64>,

        /// Exit thresholds (comma-separated).
        #[arg(long, value_delimiter = ',', default_values_t = [0.25, 0.5, 0.75])]
        exit: Vec<f64>,

        /// Process noise values; filter presets only.
        #[arg(long, value_delimiter = ',')]
        process_noise: Vec<f64>,

        /// Observation noise values; filter presets only.
        #[arg(long, value_delimiter = ',')]
        observation_noise: Vec<f64>,

        /// Number of top results to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Write a preset as a TOML config file.
    InitConfig {
        /// Named preset: baseline, enhanced.
        #[arg(long, default_value = "enhanced")]
        preset: String,

        /// Destination file.
        #[arg(long, default_value = "spreadlab.toml")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct DataArgs {
    /// CSV of `date,value` observations.
    #[arg(long, required_unless_present = "synthetic")]
    data: Option<PathBuf>,

    /// Use a seeded synthetic spread instead of a data file.
    #[arg(long, default_value_t = false, conflicts_with = "data")]
    synthetic: bool,

    /// Seed for the synthetic spread.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of business days of synthetic data.
    #[arg(long, default_value_t = 1260)]
    days: usize,

    /// First synthetic date (YYYY-MM-DD).
    #[arg(long, default_value = "2019-01-02")]
    start: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    match cli.command {
        Commands::Run {
            config,
            preset,
            data,
            events,
            output_dir,
        } => run_cmd(config, preset, &data, events, output_dir.as_deref()),
        Commands::Compare {
            data,
            events,
            sequential,
            output_dir,
        } => compare_cmd(&data, events, !sequential, output_dir.as_deref()),
        Commands::Sweep {
            preset,
            data,
            entry,
            exit,
            process_noise,
            observation_noise,
            top,
        } => {
            let grid = ParamGrid {
                entry_thresholds: entry,
                exit_thresholds: exit,
                process_noises: process_noise,
                observation_noises: observation_noise,
            };
            sweep_cmd(&preset, &data, &grid, top)
        }
        Commands::InitConfig { preset, output } => init_config_cmd(&preset, &output),
    }
}

/// Install the fmt subscriber. `RUST_LOG` takes precedence over the flags.
fn init_logging(verbose: bool, debug: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn load_data(args: &DataArgs) -> Result<LoadedData> {
    if args.synthetic {
        let start = NaiveDate::parse_from_str(&args.start, "%Y-%m-%d")
            .with_context(|| format!("invalid --start '{}'", args.start))?;
        return Ok(synthetic_spread(args.seed, start, args.days));
    }
    let Some(path) = &args.data else {
        bail!("one of --data or --synthetic is required");
    };
    load_observations(path).with_context(|| format!("failed to load {}", path.display()))
}

fn run_cmd(
    config_path: Option<PathBuf>,
    preset: Option<String>,
    data: &DataArgs,
    events: Option<PathBuf>,
    output_dir: Option<&Path>,
) -> Result<()> {
    let mut config = match (config_path, preset) {
        (Some(path), None) => BacktestConfig::from_file(&path)?,
        (None, Some(name)) => BacktestConfig::preset(&name)?,
        (None, None) => bail!("one of --config or --preset is required"),
        (Some(_), Some(_)) => bail!("--config and --preset are mutually exclusive"),
    };
    if let Some(path) = events {
        config.calendar = CalendarConfig::Dates { path };
    }

    let data = load_data(data)?;
    let result = run_loaded(&data, &config)?;
    print_summary(&result);

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&result, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn compare_cmd(
    data: &DataArgs,
    events: Option<PathBuf>,
    parallel: bool,
    output_dir: Option<&Path>,
) -> Result<()> {
    let mut enhanced = BacktestConfig::enhanced();
    if let Some(path) = events {
        enhanced.calendar = CalendarConfig::Dates { path };
    }
    let configs = [BacktestConfig::baseline(), enhanced];

    let data = load_data(data)?;
    let results = run_batch(&data, &configs, parallel)?;
    info!(runs = results.len(), parallel, "comparison finished");

    println!("{}", generate_comparison(&results));
    if data.is_synthetic {
        println!("WARNING: Results based on SYNTHETIC data");
    }

    if let Some(dir) = output_dir {
        for result in &results {
            let run_dir = save_artifacts(result, dir)?;
            println!("Artifacts saved to: {}", run_dir.display());
        }
    }
    Ok(())
}

fn sweep_cmd(preset: &str, data: &DataArgs, grid: &ParamGrid, top: usize) -> Result<()> {
    let base = BacktestConfig::preset(preset)?;
    let data = load_data(data)?;
    let results = ParamSweep::new().sweep_loaded(&data, grid, &base)?;

    println!(
        "Swept {} configurations ({} in grid before filtering)",
        results.len(),
        grid.size()
    );
    println!();
    println!(
        "{:<4} {:<40} {:>8} {:>10} {:>10} {:>7}",
        "#", "Name", "Sharpe", "Ann. Ret", "Max DD", "Trades"
    );
    println!("{}", "-".repeat(84));
    for (rank, r) in results.top_n(top).iter().enumerate() {
        println!(
            "{:<4} {:<40} {:>8.3} {:>9.2}% {:>9.2}% {:>7}",
            rank + 1,
            r.config.name,
            r.metrics.sharpe,
            r.metrics.annualized_return * 100.0,
            r.metrics.max_drawdown * 100.0,
            r.metrics.trade_count
        );
    }
    if data.is_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    Ok(())
}

fn init_config_cmd(preset: &str, output: &Path) -> Result<()> {
    let config = BacktestConfig::preset(preset)?;
    let text = config.to_toml().context("failed to serialize config")?;
    std::fs::write(output, text)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote {preset} config to {}", output.display());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Name:           {}", result.config.name);
    println!("Estimator:      {}", result.estimator);
    println!("Calendar:       {}", result.calendar);
    if let (Some(start), Some(end)) = (result.start_date(), result.end_date()) {
        println!("Period:         {start} to {end}");
    }
    println!("Steps:          {}", result.len());
    println!("Trades:         {}", m.trade_count);
    println!("Blocked:        {}", result.blocked_entries);
    println!();
    println!("--- Performance ---");
    println!("Ann. Return:    {:.2}%", m.annualized_return * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Avg Bars Held:  {:.1}", m.avg_bars_held);
    println!("Exposure:       {:.1}%", m.exposure * 100.0);
    println!("Stop-Loss:      {}", m.stop_loss_exits);
    println!("Time-Stop:      {}", m.time_stop_exits);
    if result.is_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
