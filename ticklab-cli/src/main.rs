//! TickLab CLI — run and validate backtest configurations.
//!
//! Commands:
//! - `run` — execute one backtest from a TOML config file; exits 0 when the
//!   run completes, 1 when it fails
//! - `check` — parse and validate a config without running it

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use ticklab_runner::{run_from_config, write_summary_json, BacktestConfig};

#[derive(Parser)]
#[command(
    name = "ticklab",
    about = "TickLab CLI — strategy scheduling & backtest execution"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one backtest from a TOML config file.
    Run {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Write the run summary JSON here.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Parse and validate a config file without running it.
    Check {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => cmd_run(&config, output.as_deref()),
        Commands::Check { config } => cmd_check(&config),
    }
}

fn cmd_run(config_path: &std::path::Path, output: Option<&std::path::Path>) -> Result<ExitCode> {
    let config = BacktestConfig::from_toml_path(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let summary = run_from_config(&config, None)?;

    if let Some(output) = output {
        write_summary_json(output, &summary)?;
        log::info!("summary written to {}", output.display());
    }

    println!("run {}: {:?}", summary.run_id, summary.state);
    println!(
        "  ticks: {}  final valuation: {:.2}  realized P&L: {:.2}",
        summary.ticks, summary.final_valuation, summary.realized_pnl
    );
    for position in &summary.positions {
        println!(
            "  position {}: {} @ {:.2}",
            position.symbol, position.quantity, position.avg_cost
        );
    }
    if let Some(error) = &summary.error {
        eprintln!("run failed: {error}");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_check(config_path: &std::path::Path) -> Result<ExitCode> {
    let config = BacktestConfig::from_toml_path(config_path)
        .with_context(|| format!("validating {}", config_path.display()))?;
    println!(
        "ok: {} [{}..{}] run id {}",
        config_path.display(),
        config.start_date,
        config.end_date,
        config.run_id()
    );
    Ok(ExitCode::SUCCESS)
}
