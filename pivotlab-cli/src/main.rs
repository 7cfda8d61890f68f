//! PivotLab CLI: train, predict, features and daily-change commands.
//!
//! Commands:
//! - `train`: fetch history, fit a model and save it under the model directory
//! - `predict`: load saved models and label the newest bar of each symbol
//! - `features`: dump the feature table (optionally with labels) as CSV
//! - `daily-change`: percentage change between the last two daily closes
//!
//! Every command reads bars from one `--source`: `csv` exports, the
//! terminal `connector` over HTTP, or a deterministic `synthetic` walk.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use pivotlab_core::data::{
    daily_change, fetch_table, BarSource, ConnectorBarSource, CsvBarSource, SyntheticBarSource,
};
use pivotlab_core::domain::Timeframe;
use pivotlab_core::features::compute_features;
use pivotlab_core::labels::attach_labels;
use pivotlab_runner::config::{DEFAULT_LOOKAHEAD, DEFAULT_PREDICT_BARS, DEFAULT_THRESHOLD};
use pivotlab_runner::export::{export_features_csv, export_labeled_csv, write_csv};
use pivotlab_runner::{
    predict_many, train_and_save, LivePredictor, ModelStore, PredictConfig, TrainConfig,
};

#[derive(Parser)]
#[command(
    name = "pivotlab",
    about = "PivotLab CLI: pivot/momentum features, label training and live signals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// `{SYMBOL}_{TF}.csv` files in --data-dir.
    Csv,
    /// The terminal connector's HTTP historical-data route at --url.
    Connector,
    /// Seeded random walk, no I/O.
    Synthetic,
}

#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Where bars come from.
    #[arg(long, value_enum, default_value_t = SourceKind::Synthetic)]
    source: SourceKind,

    /// Directory of CSV exports (csv source).
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Connector base URL (connector source).
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    url: String,

    /// Connector request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

impl SourceArgs {
    fn open(&self) -> Result<Box<dyn BarSource>> {
        Ok(match self.source {
            SourceKind::Csv => Box::new(CsvBarSource::new(&self.data_dir)),
            SourceKind::Connector => Box::new(
                ConnectorBarSource::new(&self.url, Duration::from_secs(self.timeout))
                    .with_context(|| format!("failed to set up connector for {}", self.url))?,
            ),
            SourceKind::Synthetic => Box::new(SyntheticBarSource::default()),
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a model for one symbol and save it.
    Train {
        /// Symbol to train on (e.g., EURUSD). Required unless --config sets it.
        #[arg(long)]
        symbol: Option<String>,

        /// Timeframe: M1, M5, M15, M30, H1, H4, D1, W1, MN1.
        #[arg(long)]
        timeframe: Option<Timeframe>,

        /// TOML training config; flags below override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bars ahead used for labelling.
        #[arg(long)]
        lookahead: Option<usize>,

        /// Minimum relative move for a buy/sell label.
        #[arg(long)]
        threshold: Option<f64>,

        /// Share of the most recent rows held out for evaluation.
        #[arg(long)]
        holdout: Option<f64>,

        /// Bars to fetch for training.
        #[arg(long)]
        bars: Option<usize>,

        /// Model directory.
        #[arg(long, default_value = "models")]
        model_dir: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Label the newest bar of each symbol with its saved model.
    Predict {
        /// Symbols to predict (e.g., EURUSD GBPUSD).
        #[arg(required = true)]
        symbols: Vec<String>,

        #[arg(long, default_value = "H4")]
        timeframe: Timeframe,

        /// Most recent bars fetched per symbol; intraday timeframes need
        /// enough to reach back past the previous week.
        #[arg(long, default_value_t = DEFAULT_PREDICT_BARS)]
        bars: usize,

        /// Model directory.
        #[arg(long, default_value = "models")]
        model_dir: PathBuf,

        /// Print signals as JSON lines.
        #[arg(long, default_value_t = false)]
        json: bool,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Compute the feature table and write it as CSV.
    Features {
        #[arg(long)]
        symbol: String,

        #[arg(long, default_value = "H4")]
        timeframe: Timeframe,

        #[arg(long, default_value_t = 500)]
        bars: usize,

        /// Append the forward-looking label column.
        #[arg(long, default_value_t = false)]
        labels: bool,

        #[arg(long, default_value_t = DEFAULT_LOOKAHEAD)]
        lookahead: usize,

        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Percentage change between the last two daily closes.
    DailyChange {
        #[arg(required = true)]
        symbols: Vec<String>,

        #[command(flatten)]
        source: SourceArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            symbol,
            timeframe,
            config,
            lookahead,
            threshold,
            holdout,
            bars,
            model_dir,
            source,
        } => {
            let overrides = TrainOverrides {
                symbol,
                timeframe,
                lookahead,
                threshold,
                holdout,
                bars,
            };
            run_train(config, overrides, model_dir, &source)
        }
        Commands::Predict {
            symbols,
            timeframe,
            bars,
            model_dir,
            json,
            source,
        } => run_predict(&symbols, timeframe, bars, model_dir, json, &source),
        Commands::Features {
            symbol,
            timeframe,
            bars,
            labels,
            lookahead,
            threshold,
            output,
            source,
        } => run_features(
            &symbol, timeframe, bars, labels, lookahead, threshold, output, &source,
        ),
        Commands::DailyChange { symbols, source } => run_daily_change(&symbols, &source),
    }
}

struct TrainOverrides {
    symbol: Option<String>,
    timeframe: Option<Timeframe>,
    lookahead: Option<usize>,
    threshold: Option<f64>,
    holdout: Option<f64>,
    bars: Option<usize>,
}

fn build_train_config(path: Option<PathBuf>, o: TrainOverrides) -> Result<TrainConfig> {
    let mut config = match path {
        Some(path) => TrainConfig::from_file(&path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => {
            let Some(symbol) = o.symbol.clone() else {
                bail!("--symbol is required without --config");
            };
            TrainConfig::new(symbol, o.timeframe.unwrap_or(Timeframe::H4))
        }
    };

    if let Some(symbol) = o.symbol {
        config.symbol = symbol;
    }
    if let Some(timeframe) = o.timeframe {
        config.timeframe = timeframe;
    }
    if let Some(lookahead) = o.lookahead {
        config.lookahead = lookahead;
    }
    if let Some(threshold) = o.threshold {
        config.threshold = threshold;
    }
    if let Some(holdout) = o.holdout {
        config.holdout_fraction = holdout;
    }
    if let Some(bars) = o.bars {
        config.bar_count = bars;
    }

    config.validate().context("invalid training configuration")?;
    Ok(config)
}

fn run_train(
    config_path: Option<PathBuf>,
    overrides: TrainOverrides,
    model_dir: PathBuf,
    source_args: &SourceArgs,
) -> Result<()> {
    let config = build_train_config(config_path, overrides)?;
    let source = source_args.open()?;
    let store = ModelStore::new(model_dir);

    let (outcome, path) = match train_and_save(source.as_ref(), &config, &store) {
        Ok(done) => done,
        Err(e) => {
            if let Some(detail) = source.last_error() {
                eprintln!("{} last error: {detail}", source.name());
            }
            return Err(e).with_context(|| {
                format!("training {} {} failed", config.symbol, config.timeframe)
            });
        }
    };

    let [sell, neutral, buy] = outcome.class_counts;
    println!(
        "{} {}: {} bars, {} feature rows, labels sell/neutral/buy = {sell}/{neutral}/{buy}",
        config.symbol, config.timeframe, outcome.bars, outcome.feature_rows
    );
    println!(
        "train rows: {}, held-out rows: {}",
        outcome.train_rows, outcome.test_rows
    );
    println!();
    print!("{}", outcome.report);
    println!();
    println!("Model saved to: {}", path.display());
    Ok(())
}

fn run_predict(
    symbols: &[String],
    timeframe: Timeframe,
    bars: usize,
    model_dir: PathBuf,
    json: bool,
    source_args: &SourceArgs,
) -> Result<()> {
    let config = PredictConfig {
        timeframe,
        bar_count: bars,
    };
    config.validate().context("invalid prediction configuration")?;

    let source = source_args.open()?;
    let store = ModelStore::new(model_dir);

    let mut failed = false;
    let mut predictors = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        match LivePredictor::load(&store, symbol, timeframe) {
            Ok(predictor) => predictors.push((symbol.clone(), predictor)),
            Err(e) => {
                eprintln!("{symbol}: {e}");
                failed = true;
            }
        }
    }

    for (symbol, result) in predict_many(source.as_ref(), &predictors, &config) {
        match result {
            Ok(Some(signal)) if json => println!("{}", serde_json::to_string(&signal)?),
            Ok(Some(signal)) => println!(
                "{symbol} {timeframe} {}: {} (sell {:.3}, neutral {:.3}, buy {:.3})",
                signal.timestamp,
                signal.label,
                signal.probabilities[0],
                signal.probabilities[1],
                signal.probabilities[2]
            ),
            Ok(None) => println!("{symbol} {timeframe}: no signal"),
            Err(e) => {
                eprintln!("{symbol}: {e}");
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_features(
    symbol: &str,
    timeframe: Timeframe,
    bars: usize,
    labels: bool,
    lookahead: usize,
    threshold: f64,
    output: Option<PathBuf>,
    source_args: &SourceArgs,
) -> Result<()> {
    let source = source_args.open()?;
    let table = fetch_table(source.as_ref(), symbol, timeframe, bars)
        .with_context(|| format!("failed to fetch {symbol} {timeframe}"))?;
    let features = compute_features(&table);

    let csv = if labels {
        let labeled = attach_labels(&features, lookahead, threshold)?;
        export_labeled_csv(&labeled)?
    } else {
        export_features_csv(&features)?
    };

    match output {
        Some(path) => {
            write_csv(&path, &csv)?;
            eprintln!(
                "{} rows from {} bars written to {}",
                features.len(),
                table.len(),
                path.display()
            );
        }
        None => print!("{csv}"),
    }
    Ok(())
}

fn run_daily_change(symbols: &[String], source_args: &SourceArgs) -> Result<()> {
    let source = source_args.open()?;
    let mut failed = false;
    for symbol in symbols {
        match daily_change(source.as_ref(), symbol) {
            Ok(Some(change)) => println!("{symbol}: {change:+.2}%"),
            Ok(None) => println!("{symbol}: not enough daily bars"),
            Err(e) => {
                eprintln!("{symbol}: {e}");
                failed = true;
            }
        }
    }
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_defaults_to_four_hour_bars() {
        let cli = Cli::try_parse_from(["pivotlab", "predict", "EURUSD"]).unwrap();
        match cli.command {
            Commands::Predict {
                timeframe, bars, ..
            } => {
                assert_eq!(timeframe, Timeframe::H4);
                assert_eq!(bars, DEFAULT_PREDICT_BARS);
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn train_without_timeframe_matches_predict_default() {
        let overrides = TrainOverrides {
            symbol: Some("EURUSD".into()),
            timeframe: None,
            lookahead: None,
            threshold: None,
            holdout: None,
            bars: None,
        };
        let config = build_train_config(None, overrides).unwrap();
        assert_eq!(config.timeframe, Timeframe::H4);
    }
}
