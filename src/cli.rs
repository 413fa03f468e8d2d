//! CLI definition and dispatch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::adapters::csv_adapter::CsvTickSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config::SimulationConfig;
use crate::domain::error::FxsimError;
use crate::domain::simulation::{EquityRecord, Simulator};
use crate::domain::strategy::{BuyAndHold, Contrarian, Strategy};
use crate::ports::tick_port::TickSource;

#[derive(Parser, Debug)]
#[command(name = "fxsim", about = "Tick-level forex backtesting simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over a tick CSV file
    Backtest {
        /// INI config file; defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Tick data CSV (timestamp,ask,bid,volume)
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long, default_value = "EUR_USD")]
        symbol: String,
        /// Decimal digits of the instrument's quotes
        #[arg(long, default_value_t = 5)]
        digit: u32,
        /// Strategy name: buyandhold or contrarian
        #[arg(short, long, default_value = "buyandhold")]
        strategy: String,
        /// Position volume in lots
        #[arg(short, long, default_value_t = 1.0)]
        volume: f64,
        /// Rolling window for the contrarian signal, in ticks
        #[arg(short, long, default_value_t = 16)]
        window: usize,
        /// Write the equity curve to this CSV file
        #[arg(long)]
        equity_out: Option<PathBuf>,
    },
    /// Show tick data range for a CSV file
    Info {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long, default_value = "EUR_USD")]
        symbol: String,
        #[arg(long, default_value_t = 5)]
        digit: u32,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            symbol,
            digit,
            strategy,
            volume,
            window,
            equity_out,
        } => run_backtest(
            config.as_deref(),
            &data,
            &symbol,
            digit,
            &strategy,
            volume,
            window,
            equity_out.as_deref(),
        ),
        Command::Info {
            data,
            symbol,
            digit,
        } => run_info(&data, &symbol, digit),
    }
}

fn fail(err: &FxsimError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig, FxsimError> {
    match path {
        Some(path) => FileConfigAdapter::from_file(path)?.simulation_config(),
        None => Ok(SimulationConfig::default()),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_backtest(
    config_path: Option<&Path>,
    data_path: &Path,
    symbol: &str,
    digit: u32,
    strategy_name: &str,
    volume: f64,
    window: usize,
    equity_out: Option<&Path>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };

    eprintln!("Loading ticks from {}", data_path.display());
    let ticks = match CsvTickSource::from_file(data_path, symbol, digit) {
        Ok(ticks) => ticks,
        Err(e) => return fail(&e),
    };
    eprintln!("Loaded {} ticks", ticks.len());

    let mut sim = match Simulator::new(config, Box::new(ticks)) {
        Ok(sim) => sim,
        Err(e) => return fail(&e),
    };

    let mut strategy: Box<dyn Strategy> = match strategy_name {
        "buyandhold" => Box::new(BuyAndHold::new(volume)),
        "contrarian" => Box::new(Contrarian::new(sim.ticks(), window, volume)),
        other => {
            let err = FxsimError::ConfigInvalid {
                section: "cli".into(),
                key: "strategy".into(),
                reason: format!("unknown strategy '{}'", other),
            };
            return fail(&err);
        }
    };

    if let Err(e) = sim.run(strategy.as_mut()) {
        return fail(&e);
    }

    if let Some(report) = sim.report() {
        println!("{report}");
    }

    if let Some(path) = equity_out {
        if let Err(e) = write_equity_csv(path, sim.equity_records()) {
            return fail(&e);
        }
        eprintln!("Equity curve written to {}", path.display());
    }

    ExitCode::SUCCESS
}

fn write_equity_csv(path: &Path, records: &[EquityRecord]) -> Result<(), FxsimError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| FxsimError::Data {
        reason: format!("failed to open {}: {}", path.display(), e),
    })?;
    writer
        .write_record([
            "timestamp",
            "balance",
            "realized_profit",
            "equity",
            "floating_profit",
            "margin_used",
            "free_margin",
            "margin_level",
            "margin_health",
        ])
        .map_err(|e| FxsimError::Data {
            reason: format!("CSV write error: {}", e),
        })?;
    for record in records {
        writer
            .write_record([
                record.timestamp.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
                record.balance.to_string(),
                record.realized_profit.to_string(),
                record.equity.to_string(),
                record.floating_profit.to_string(),
                record.margin_used.to_string(),
                record.free_margin.to_string(),
                record.margin_level.to_string(),
                record.margin_health.as_str().to_string(),
            ])
            .map_err(|e| FxsimError::Data {
                reason: format!("CSV write error: {}", e),
            })?;
    }
    writer.flush().map_err(FxsimError::Io)?;
    Ok(())
}

fn run_info(data_path: &Path, symbol: &str, digit: u32) -> ExitCode {
    let ticks = match CsvTickSource::from_file(data_path, symbol, digit) {
        Ok(ticks) => ticks,
        Err(e) => return fail(&e),
    };

    println!("symbol: {symbol}");
    println!("ticks: {}", ticks.len());
    if ticks.is_empty() {
        return ExitCode::SUCCESS;
    }

    if let (Some(first), Some(last)) = (ticks.tick(0), ticks.tick(ticks.len() - 1)) {
        println!("from: {}", first.timestamp);
        println!("to:   {}", last.timestamp);
    }

    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    let mut spread_total: i64 = 0;
    for index in 0..ticks.len() {
        if let Some(tick) = ticks.tick(index) {
            low = low.min(tick.mid);
            high = high.max(tick.mid);
            spread_total += tick.spread;
        }
    }
    println!("mid range: {low} .. {high}");
    println!(
        "avg spread: {:.1} points",
        spread_total as f64 / ticks.len() as f64
    );
    ExitCode::SUCCESS
}
