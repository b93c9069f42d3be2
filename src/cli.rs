//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::{read_bars_file, write_bars, CsvBarSource};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::aggregator::PredictionRow;
use crate::domain::config::{build_pipeline_config, PipelineConfig};
use crate::domain::error::ConfluenceError;
use crate::domain::money::{MoneyManager, DEFAULT_RISK_PERCENT};
use crate::domain::pipeline::run_workflow;
use crate::domain::resample::resample;
use crate::domain::signal::{candle_signal, DEFAULT_OFFSET};
use crate::domain::timeframe::parse_timeframe;
use crate::domain::trend::{detect_trend, DEFAULT_LONG_WINDOW, DEFAULT_SHORT_WINDOW};
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "confluence", about = "Multi-timeframe probability signal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train on history and print the probability of an up move for recent rows
    Predict {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Comma separated, finest first (e.g. M1,M15,H1)
        #[arg(long)]
        timeframes: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Position size for a given capital, volatility and price
    Size {
        #[arg(long)]
        capital: f64,
        #[arg(long)]
        volatility: f64,
        #[arg(long)]
        price: f64,
        /// Percent of capital at risk
        #[arg(long, default_value_t = DEFAULT_RISK_PERCENT)]
        risk_fraction: f64,
    },
    /// Classify the moving-average trend of a bar file
    Trend {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SHORT_WINDOW)]
        short: usize,
        #[arg(long, default_value_t = DEFAULT_LONG_WINDOW)]
        long: usize,
    },
    /// Direction, stop and target from the last candle of a bar file
    Signal {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, default_value_t = DEFAULT_OFFSET)]
        offset: f64,
    },
    /// Aggregate a bar file into a coarser timeframe
    Resample {
        #[arg(short, long)]
        input: PathBuf,
        /// Target timeframe (e.g. H4, 1D)
        #[arg(long)]
        to: String,
        #[arg(short, long)]
        output: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let ConfluenceError::DataUnavailable { .. } = e {
                eprintln!("error: data not found ({e}); place the CSV files in the configured data_path");
            } else {
                eprintln!("error: {e}");
            }
            (&e).into()
        }
    }
}

/// Runs one subcommand, leaving error reporting to the caller.
pub fn execute(command: Command) -> Result<(), ConfluenceError> {
    match command {
        Command::Predict {
            config,
            symbol,
            timeframes,
            output,
        } => run_predict(
            &config,
            symbol.as_deref(),
            timeframes.as_deref(),
            output.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Size {
            capital,
            volatility,
            price,
            risk_fraction,
        } => run_size(capital, volatility, price, risk_fraction),
        Command::Trend { input, short, long } => run_trend(&input, short, long),
        Command::Signal { input, offset } => run_signal(&input, offset),
        Command::Resample { input, to, output } => run_resample(&input, &to, &output),
    }
}

/// Loads the INI file and applies command-line overrides.
pub fn load_pipeline_config(
    path: &Path,
    symbol: Option<&str>,
    timeframes: Option<&str>,
) -> Result<PipelineConfig, ConfluenceError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    let overlay = OverlayConfig {
        inner: &adapter,
        symbol,
        timeframes,
    };
    build_pipeline_config(&overlay)
}

/// `[data]` keys given on the command line shadow the file's values.
struct OverlayConfig<'a> {
    inner: &'a FileConfigAdapter,
    symbol: Option<&'a str>,
    timeframes: Option<&'a str>,
}

impl ConfigPort for OverlayConfig<'_> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        match (section, key) {
            ("data", "symbol") if self.symbol.is_some() => self.symbol.map(str::to_string),
            ("data", "timeframes") if self.timeframes.is_some() => {
                self.timeframes.map(str::to_string)
            }
            _ => self.inner.get_string(section, key),
        }
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.inner.get_int(section, key, default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.inner.get_double(section, key, default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.inner.get_bool(section, key, default)
    }
}

fn run_predict(
    config_path: &Path,
    symbol: Option<&str>,
    timeframes: Option<&str>,
    output: Option<&Path>,
) -> Result<(), ConfluenceError> {
    info!(config = %config_path.display(), "loading config");
    let cfg = load_pipeline_config(config_path, symbol, timeframes)?;
    info!(
        symbol = %cfg.symbol,
        timeframes = %cfg.timeframes.join(","),
        data_path = %cfg.data_path.display(),
        "running workflow"
    );

    let source = CsvBarSource::new(cfg.data_path.clone());
    let predictions = run_workflow(&cfg, &source)?;

    match output {
        Some(path) => {
            write_predictions(File::create(path)?, &predictions)?;
            info!(path = %path.display(), rows = predictions.len(), "predictions written");
        }
        None => write_predictions(io::stdout().lock(), &predictions)?,
    }
    Ok(())
}

/// Writes `timestamp,probability` rows.
pub fn write_predictions<W: Write>(writer: W, rows: &[PredictionRow]) -> Result<(), ConfluenceError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let to_io = |e: csv::Error| ConfluenceError::Io(io::Error::other(e));
    wtr.write_record(["timestamp", "probability"]).map_err(to_io)?;
    for row in rows {
        wtr.write_record([
            row.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            format!("{:.6}", row.probability),
        ])
        .map_err(to_io)?;
    }
    wtr.flush()?;
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), ConfluenceError> {
    let cfg = load_pipeline_config(config_path, None, None)?;
    eprintln!("Config validated successfully");
    eprintln!("  symbol:     {}", cfg.symbol);
    eprintln!("  timeframes: {} (label on {})", cfg.timeframes.join(", "), cfg.timeframes[0]);
    eprintln!(
        "  windows:    ma={} osc={} vol={}",
        cfg.windows.moving_average, cfg.windows.oscillator, cfg.windows.volatility
    );
    eprintln!("  test_size:  {}", cfg.test_size);
    eprintln!("  risk:       {}%", cfg.risk_percent);
    Ok(())
}

fn run_size(capital: f64, volatility: f64, price: f64, risk_percent: f64) -> Result<(), ConfluenceError> {
    let units = MoneyManager::new(risk_percent)?.position_size(capital, volatility, price)?;
    println!("{:.6}", units);
    Ok(())
}

fn run_trend(input: &Path, short: usize, long: usize) -> Result<(), ConfluenceError> {
    let closes: Vec<f64> = read_bars_file(input)?.iter().map(|b| b.close).collect();
    println!("{}", detect_trend(&closes, short, long)?);
    Ok(())
}

fn run_signal(input: &Path, offset: f64) -> Result<(), ConfluenceError> {
    let signal = candle_signal(&read_bars_file(input)?, offset)?;
    println!("Signal: {}", signal.direction);
    println!("Stop: {:.2}", signal.stop);
    println!("Target: {:.2}", signal.target);
    Ok(())
}

fn run_resample(input: &Path, to: &str, output: &Path) -> Result<(), ConfluenceError> {
    let period = parse_timeframe(to)?;
    let bars = read_bars_file(input)?;
    let resampled = resample(&bars, period)?;
    write_bars(output, &resampled)?;
    eprintln!(
        "Resampled {} bars into {} {} bars: {}",
        bars.len(),
        resampled.len(),
        to,
        output.display()
    );
    Ok(())
}
